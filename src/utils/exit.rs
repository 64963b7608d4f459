use std::time::Instant;

use crossbeam_channel::bounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;

/// Held by a background thread for as long as it runs.
///
/// Nothing is ever sent: dropping the notice, including while unwinding,
/// disconnects the paired [`ExitWatch`].
#[derive(Clone)]
pub(crate) struct ExitNotice {
    _alive: Sender<()>,
}

/// Observes the exit of every thread holding a clone of the paired notice
#[derive(Debug)]
pub(crate) struct ExitWatch {
    exited: Receiver<()>,
}

pub(crate) fn exit_pair() -> (ExitNotice, ExitWatch) {
    let (alive, exited) = bounded(0);
    (ExitNotice { _alive: alive }, ExitWatch { exited })
}

impl ExitWatch {
    /// Waits until every notice is dropped or `deadline` passes; returns
    /// whether they were all dropped
    pub(crate) fn wait_until(
        &self,
        deadline: Instant,
    ) -> bool {
        matches!(self.exited.recv_deadline(deadline), Err(RecvTimeoutError::Disconnected))
    }
}
