use std::rc::Rc;

use thiserror::Error;

use crate::class::{Routine, ScriptClass};
use crate::coroutine::Completion;
use crate::value::ScriptValue;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unknown routine {class}.{name}")]
    UnknownRoutine { class: String, name: String },

    #[error("routine {routine} has no body")]
    NoBody { routine: String },

    #[error("routine {routine} takes {expected} arguments, got {actual}")]
    ArgumentCount {
        routine: String,
        expected: usize,
        actual: usize,
    },

    #[error("routine {routine} needs an instance receiver")]
    NoReceiver { routine: String },

    #[error("routine {routine} is not a coroutine")]
    NotACoroutine { routine: String },

    #[error("routine {routine} failed: {message}")]
    Failed { routine: String, message: String },

    #[error("coroutine {routine} was cancelled")]
    Cancelled { routine: String },
}

/// What a routine is invoked on
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// Class-level call on the named class
    Class(String),
    Instance(ScriptValue),
}

impl Receiver {
    pub fn instance(&self) -> Option<&ScriptValue> {
        match self {
            Receiver::Instance(value) => Some(value),
            Receiver::Class(_) => None,
        }
    }
}

/// Receives calls of event-trigger routines
///
/// A runtime hands every call of an [`RoutineKind::EventTrigger`] routine to
/// the sink it was given for the current invocation.
///
/// [`RoutineKind::EventTrigger`]: crate::RoutineKind::EventTrigger
pub trait EventSink {
    fn trigger_event(&mut self, routine: &Routine, receiver: &ScriptValue, args: &[ScriptValue]);
}

/// Sink that drops every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn trigger_event(&mut self, _routine: &Routine, _receiver: &ScriptValue, _args: &[ScriptValue]) {}
}

/// The script runtime as seen by the bridge
pub trait ScriptRuntime {
    /// Every class the runtime knows, superclasses before subclasses
    fn classes(&self) -> Vec<Rc<ScriptClass>>;

    fn find_class(&self, name: &str) -> Option<Rc<ScriptClass>> {
        self.classes().into_iter().find(|c| c.name() == name)
    }

    fn find_routine(&self, class_name: &str, routine_name: &str, class_member: bool) -> Option<Rc<Routine>> {
        self.find_class(class_name)?
            .find_routine(routine_name, class_member)
    }

    /// Run a routine to completion
    fn invoke(
        &mut self,
        routine: &Rc<Routine>,
        receiver: Receiver,
        args: Vec<ScriptValue>,
        events: &mut dyn EventSink,
    ) -> Result<ScriptValue, ScriptError>;

    /// Start a coroutine. The outcome is delivered through `completion`,
    /// possibly during a later [`ScriptRuntime::update`].
    fn start_coroutine(
        &mut self,
        routine: &Rc<Routine>,
        receiver: Receiver,
        args: Vec<ScriptValue>,
        completion: Completion,
        events: &mut dyn EventSink,
    ) -> Result<(), ScriptError>;

    /// Advance running coroutines by one step
    fn update(&mut self, _events: &mut dyn EventSink) {}
}
