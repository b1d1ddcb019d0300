use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::class::{builtin, Routine, RoutineKind, ScriptClass};
use crate::coroutine::Completion;
use crate::runtime::{EventSink, Receiver, ScriptError, ScriptRuntime};
use crate::value::ScriptValue;

pub type MethodBody = Rc<dyn Fn(&mut CallScope<'_>) -> Result<ScriptValue, ScriptError>>;

/// Coroutine body, called once per update with the number of steps taken so far
pub type CoroutineBody = Rc<dyn Fn(&mut CallScope<'_>, u32) -> CoroutineStep>;

/// Result of one coroutine step
#[derive(Debug, Clone, PartialEq)]
pub enum CoroutineStep {
    Yield,
    Done(ScriptValue),
    Fail(String),
}

enum Body {
    Method(MethodBody),
    Coroutine(CoroutineBody),
}

struct RunningCoroutine {
    routine: Rc<Routine>,
    receiver: Receiver,
    args: Vec<ScriptValue>,
    steps: u32,
    body: CoroutineBody,
    completion: Completion,
}

/// What a routine body sees while it runs
pub struct CallScope<'a> {
    routine: &'a Routine,
    receiver: &'a Receiver,
    args: &'a [ScriptValue],
    classes: &'a [Rc<ScriptClass>],
    events: &'a mut dyn EventSink,
}

impl<'a> CallScope<'a> {
    pub fn routine(&self) -> &Routine {
        self.routine
    }

    pub fn receiver(&self) -> &Receiver {
        self.receiver
    }

    pub fn args(&self) -> &[ScriptValue] {
        self.args
    }

    /// Argument at `index`, nil when missing
    pub fn arg(&self, index: usize) -> ScriptValue {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Call the event-trigger routine `name` on the current receiver
    pub fn fire(&mut self, name: &str, args: Vec<ScriptValue>) -> Result<(), ScriptError> {
        let receiver = self.receiver.instance().ok_or_else(|| ScriptError::NoReceiver {
            routine: name.to_string(),
        })?;

        let scope = self.routine.scope_name();
        let routine = self
            .classes
            .iter()
            .find(|c| c.name() == scope)
            .and_then(|c| c.find_routine_inherited(name, false))
            .filter(|r| r.kind() == RoutineKind::EventTrigger)
            .ok_or_else(|| ScriptError::UnknownRoutine {
                class: scope.to_string(),
                name: name.to_string(),
            })?;

        check_arity(&routine, args.len())?;
        self.events.trigger_event(&routine, receiver, &args);
        Ok(())
    }
}

/// Script runtime whose routine bodies are Rust closures
pub struct MemoryRuntime {
    classes: Vec<Rc<ScriptClass>>,
    bodies: HashMap<u64, Body>,
    running: Vec<RunningCoroutine>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        let object = ScriptClass::new(builtin::OBJECT, None);
        let mut classes = vec![Rc::clone(&object)];
        for name in [
            builtin::NONE,
            builtin::BOOLEAN,
            builtin::INTEGER,
            builtin::REAL,
            builtin::STRING,
            builtin::VECTOR3,
            builtin::ROTATION_ANGLES,
            builtin::TRANSFORM,
            builtin::ENTITY,
        ] {
            classes.push(ScriptClass::new(name, Some(Rc::clone(&object))));
        }

        Self {
            classes,
            bodies: HashMap::new(),
            running: Vec::new(),
        }
    }

    /// Declare a class deriving from `superclass` (`Object` when `None`)
    pub fn define_class(&mut self, name: &str, superclass: Option<&str>) -> Rc<ScriptClass> {
        let superclass = superclass
            .and_then(|s| self.class(s))
            .unwrap_or_else(|| Rc::clone(&self.classes[0]));
        let class = ScriptClass::new(name, Some(superclass));
        self.classes.retain(|c| c.name() != name);
        self.classes.push(Rc::clone(&class));
        class
    }

    pub fn class(&self, name: &str) -> Option<Rc<ScriptClass>> {
        self.classes.iter().find(|c| c.name() == name).cloned()
    }

    pub fn add_method<F>(&mut self, class: &Rc<ScriptClass>, routine: Routine, body: F) -> Rc<Routine>
    where
        F: Fn(&mut CallScope<'_>) -> Result<ScriptValue, ScriptError> + 'static,
    {
        let routine = class.add_routine(routine);
        self.bodies.insert(routine.id(), Body::Method(Rc::new(body)));
        routine
    }

    pub fn add_coroutine<F>(&mut self, class: &Rc<ScriptClass>, routine: Routine, body: F) -> Rc<Routine>
    where
        F: Fn(&mut CallScope<'_>, u32) -> CoroutineStep + 'static,
    {
        let routine = class.add_routine(routine);
        self.bodies.insert(routine.id(), Body::Coroutine(Rc::new(body)));
        routine
    }

    /// Declare an event-trigger routine. Its body is the bridge.
    pub fn add_event(&mut self, class: &Rc<ScriptClass>, routine: Routine) -> Rc<Routine> {
        class.add_routine(routine)
    }

    pub fn running_coroutines(&self) -> usize {
        self.running.len()
    }

    /// Step a coroutine once. Returns it back if it is still running.
    fn step(
        classes: &[Rc<ScriptClass>],
        mut running: RunningCoroutine,
        events: &mut dyn EventSink,
    ) -> Option<RunningCoroutine> {
        if running.completion.is_cancelled() {
            debug!(
                target: "script",
                "Abandoning cancelled coroutine {}",
                running.routine.qualified_name()
            );
            return None;
        }

        let mut scope = CallScope {
            routine: &running.routine,
            receiver: &running.receiver,
            args: &running.args,
            classes,
            events,
        };
        let step = (running.body)(&mut scope, running.steps);
        running.steps += 1;

        let outcome = match step {
            CoroutineStep::Yield => return Some(running),
            CoroutineStep::Done(value) => Ok(value),
            CoroutineStep::Fail(message) => Err(ScriptError::Failed {
                routine: running.routine.qualified_name(),
                message,
            }),
        };

        if !running.completion.complete(outcome) {
            debug!(
                target: "script",
                "Coroutine {} finished with nobody waiting",
                running.routine.qualified_name()
            );
        }
        None
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRuntime")
            .field("classes", &self.classes.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("bodies", &self.bodies.len())
            .field("running", &self.running.len())
            .finish()
    }
}

impl ScriptRuntime for MemoryRuntime {
    fn classes(&self) -> Vec<Rc<ScriptClass>> {
        self.classes.clone()
    }

    fn find_class(&self, name: &str) -> Option<Rc<ScriptClass>> {
        self.class(name)
    }

    fn invoke(
        &mut self,
        routine: &Rc<Routine>,
        receiver: Receiver,
        args: Vec<ScriptValue>,
        events: &mut dyn EventSink,
    ) -> Result<ScriptValue, ScriptError> {
        check_arity(routine, args.len())?;

        match routine.kind() {
            RoutineKind::EventTrigger => {
                let target = receiver.instance().ok_or_else(|| ScriptError::NoReceiver {
                    routine: routine.qualified_name(),
                })?;
                events.trigger_event(routine, target, &args);
                Ok(ScriptValue::Nil)
            }
            RoutineKind::Coroutine => Err(ScriptError::Failed {
                routine: routine.qualified_name(),
                message: "coroutines are started, not invoked".to_string(),
            }),
            RoutineKind::Method => {
                let Some(Body::Method(body)) = self.bodies.get(&routine.id()) else {
                    return Err(ScriptError::NoBody {
                        routine: routine.qualified_name(),
                    });
                };
                let body = Rc::clone(body);
                let mut scope = CallScope {
                    routine,
                    receiver: &receiver,
                    args: &args,
                    classes: &self.classes,
                    events,
                };
                body(&mut scope)
            }
        }
    }

    fn start_coroutine(
        &mut self,
        routine: &Rc<Routine>,
        receiver: Receiver,
        args: Vec<ScriptValue>,
        completion: Completion,
        events: &mut dyn EventSink,
    ) -> Result<(), ScriptError> {
        if routine.kind() != RoutineKind::Coroutine {
            return Err(ScriptError::NotACoroutine {
                routine: routine.qualified_name(),
            });
        }
        check_arity(routine, args.len())?;

        let Some(Body::Coroutine(body)) = self.bodies.get(&routine.id()) else {
            return Err(ScriptError::NoBody {
                routine: routine.qualified_name(),
            });
        };

        let running = RunningCoroutine {
            routine: Rc::clone(routine),
            receiver,
            args,
            steps: 0,
            body: Rc::clone(body),
            completion,
        };

        // Runs up to its first yield before returning
        if let Some(running) = Self::step(&self.classes, running, events) {
            self.running.push(running);
        }
        Ok(())
    }

    fn update(&mut self, events: &mut dyn EventSink) {
        let running = std::mem::take(&mut self.running);
        for coroutine in running {
            if let Some(coroutine) = Self::step(&self.classes, coroutine, events) {
                self.running.push(coroutine);
            }
        }
    }
}

fn check_arity(routine: &Routine, actual: usize) -> Result<(), ScriptError> {
    let expected = routine.params().len();
    if expected != actual {
        warn!(
            target: "script",
            "{} called with {} arguments, expects {}",
            routine.qualified_name(),
            actual,
            expected
        );
        return Err(ScriptError::ArgumentCount {
            routine: routine.qualified_name(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NullEventSink;

    struct RecordingSink(Vec<(String, Vec<ScriptValue>)>);

    impl EventSink for RecordingSink {
        fn trigger_event(&mut self, routine: &Routine, _receiver: &ScriptValue, args: &[ScriptValue]) {
            self.0.push((routine.name().to_string(), args.to_vec()));
        }
    }

    fn integer(runtime: &MemoryRuntime) -> Rc<ScriptClass> {
        runtime.class(builtin::INTEGER).unwrap()
    }

    #[test]
    fn test_invoke_method() {
        let mut runtime = MemoryRuntime::new();
        let class = runtime.define_class("Calculator", None);
        let int = integer(&runtime);
        let add = runtime.add_method(
            &class,
            Routine::new("add", RoutineKind::Method)
                .class_member()
                .with_param("a", &int)
                .with_param("b", &int)
                .returning(&int),
            |scope| {
                let a = scope.arg(0).as_integer().unwrap_or(0);
                let b = scope.arg(1).as_integer().unwrap_or(0);
                Ok(ScriptValue::Integer(a + b))
            },
        );

        let result = runtime
            .invoke(
                &add,
                Receiver::Class("Calculator".to_string()),
                vec![3.into(), 4.into()],
                &mut NullEventSink,
            )
            .unwrap();
        assert_eq!(result, ScriptValue::Integer(7));

        let wrong = runtime.invoke(&add, Receiver::Class("Calculator".to_string()), vec![], &mut NullEventSink);
        assert!(matches!(wrong, Err(ScriptError::ArgumentCount { expected: 2, actual: 0, .. })));
    }

    #[test]
    fn test_method_fires_event() {
        let mut runtime = MemoryRuntime::new();
        let actor = runtime.define_class("Actor", Some(builtin::ENTITY));
        let real = runtime.class(builtin::REAL).unwrap();
        runtime.add_event(&actor, Routine::new("on_hit", RoutineKind::EventTrigger).with_param("amount", &real));
        let hit = runtime.add_method(&actor, Routine::new("hit", RoutineKind::Method), |scope| {
            scope.fire("on_hit", vec![ScriptValue::Real(2.5)])?;
            Ok(ScriptValue::Nil)
        });

        let mut sink = RecordingSink(Vec::new());
        runtime
            .invoke(&hit, Receiver::Instance(ScriptValue::Integer(0)), vec![], &mut sink)
            .unwrap();
        assert_eq!(sink.0, vec![("on_hit".to_string(), vec![ScriptValue::Real(2.5)])]);
    }

    #[test]
    fn test_coroutine_completes_after_yields() {
        let mut runtime = MemoryRuntime::new();
        let actor = runtime.define_class("Actor", Some(builtin::ENTITY));
        let wait = runtime.add_coroutine(&actor, Routine::new("wait_two", RoutineKind::Coroutine), |_, steps| {
            if steps < 2 {
                CoroutineStep::Yield
            } else {
                CoroutineStep::Done(ScriptValue::Boolean(true))
            }
        });

        let (completion, mut receiver) = Completion::channel("wait_two");
        runtime
            .start_coroutine(&wait, Receiver::Instance(ScriptValue::Nil), vec![], completion, &mut NullEventSink)
            .unwrap();
        assert_eq!(runtime.running_coroutines(), 1);

        runtime.update(&mut NullEventSink);
        assert!(receiver.try_recv().is_err());
        runtime.update(&mut NullEventSink);
        assert_eq!(receiver.try_recv().unwrap().unwrap(), ScriptValue::Boolean(true));
        assert_eq!(runtime.running_coroutines(), 0);
    }

    #[test]
    fn test_cancelled_coroutine_is_abandoned() {
        let mut runtime = MemoryRuntime::new();
        let actor = runtime.define_class("Actor", Some(builtin::ENTITY));
        let forever = runtime.add_coroutine(&actor, Routine::new("forever", RoutineKind::Coroutine), |_, _| {
            CoroutineStep::Yield
        });

        let (completion, receiver) = Completion::channel("forever");
        runtime
            .start_coroutine(&forever, Receiver::Instance(ScriptValue::Nil), vec![], completion, &mut NullEventSink)
            .unwrap();
        drop(receiver);

        runtime.update(&mut NullEventSink);
        assert_eq!(runtime.running_coroutines(), 0);
    }

    #[test]
    fn test_debug_lists_classes() {
        let mut runtime = MemoryRuntime::new();
        runtime.define_class("Actor", Some(builtin::ENTITY));

        let text = format!("{:?}", runtime);
        assert!(text.starts_with("MemoryRuntime"));
        assert!(text.contains("\"Actor\""));
        assert!(text.contains("running: 0"));
    }
}
