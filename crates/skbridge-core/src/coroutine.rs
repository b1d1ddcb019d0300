use skbridge_script::{CoroutineOutcome, Routine, ScriptError};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::debug;

struct PendingCoroutine {
    binding_index: usize,
    routine_name: String,
    receiver: oneshot::Receiver<CoroutineOutcome>,
}

/// A coroutine started from the host that has finished
#[derive(Debug)]
pub struct CoroutineCompletion {
    pub binding_index: usize,
    pub routine_name: String,
    pub outcome: CoroutineOutcome,
}

/// Coroutines started by host calls that have not reported back yet
#[derive(Default)]
pub struct CoroutineTracker {
    pending: Vec<PendingCoroutine>,
}

impl CoroutineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, binding_index: usize, routine: &Routine, receiver: oneshot::Receiver<CoroutineOutcome>) {
        debug!(target: "bridge", "Tracking coroutine {}", routine.qualified_name());
        self.pending.push(PendingCoroutine {
            binding_index,
            routine_name: routine.qualified_name(),
            receiver,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Collect coroutines that finished since the last poll
    ///
    /// A coroutine the runtime dropped without an outcome is reported as
    /// cancelled.
    pub fn poll(&mut self) -> Vec<CoroutineCompletion> {
        let mut finished = Vec::new();

        self.pending.retain_mut(|pending| {
            let outcome = match pending.receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Closed) => Err(ScriptError::Cancelled {
                    routine: pending.routine_name.clone(),
                }),
            };

            finished.push(CoroutineCompletion {
                binding_index: pending.binding_index,
                routine_name: pending.routine_name.clone(),
                outcome,
            });
            false
        });

        finished
    }

    /// Stop waiting on every pending coroutine
    ///
    /// Dropping the receivers tells the runtime to abandon them.
    pub fn abandon_all(&mut self) -> usize {
        let count = self.pending.len();
        if count > 0 {
            debug!(target: "bridge", "Abandoning {} pending coroutines", count);
        }
        self.pending.clear();
        count
    }
}
