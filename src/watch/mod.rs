//! Signal watching.
//!
//! A single background loop waits on the transport for control-line changes,
//! turns each detection cycle into per-signal change events and fans them out
//! to registered listeners through a dispatch pool, so slow listeners never
//! stall detection.
//!
//! Registry mutations while the loop runs are sent to the loop thread itself
//! and applied between detection cycles; the mutating caller blocks until the
//! loop acknowledges.

mod dispatch_pool;
mod registry;
mod signal_watcher;

pub(crate) use dispatch_pool::*;
pub use registry::*;
pub use signal_watcher::*;


use crate::SignalId;

/// Receives level changes of the signals it is registered on
///
/// Invoked on a dispatch worker thread. Notifications are independent of each
/// other: two changes of the same signal may be delivered out of order.
pub trait SignalListener: Send + Sync + 'static {
    fn signal_changed(
        &self,
        signal: SignalId,
        value: bool,
    );
}

impl<F> SignalListener for F
where
    F: Fn(SignalId, bool) + Send + Sync + 'static,
{
    fn signal_changed(
        &self,
        signal: SignalId,
        value: bool,
    ) {
        self(signal, value)
    }
}

/// Lifecycle of the detection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    /// Detection cycles are running
    Running,
    /// The loop is applying a registry mutation between cycles
    Suspended,
}
