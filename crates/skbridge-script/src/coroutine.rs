use tokio::sync::oneshot;

use crate::runtime::ScriptError;
use crate::value::ScriptValue;

pub type CoroutineOutcome = Result<ScriptValue, ScriptError>;

/// Script-side end of a started coroutine
///
/// The caller keeps the matching receiver. Dropping that receiver is the
/// cancellation signal: the runtime should stop stepping the coroutine the
/// next time it checks [`Completion::is_cancelled`].
#[derive(Debug)]
pub struct Completion {
    routine: String,
    sender: oneshot::Sender<CoroutineOutcome>,
}

impl Completion {
    pub fn channel(routine: impl Into<String>) -> (Completion, oneshot::Receiver<CoroutineOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (
            Completion {
                routine: routine.into(),
                sender,
            },
            receiver,
        )
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// Deliver the outcome. Returns false when nobody is waiting any more.
    pub fn complete(self, outcome: CoroutineOutcome) -> bool {
        self.sender.send(outcome).is_ok()
    }
}
