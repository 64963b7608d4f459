use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::wait_for;
use crate::SignalId;
use crate::SignalListener;

/// Listener that records every notification it receives
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(SignalId, bool)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(SignalId, bool)> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Waits until at least `n` notifications arrived
    pub fn wait_for_events(
        &self,
        n: usize,
        timeout: Duration,
    ) -> bool {
        wait_for(timeout, || self.count() >= n)
    }
}

impl SignalListener for RecordingListener {
    fn signal_changed(
        &self,
        signal: SignalId,
        value: bool,
    ) {
        self.events.lock().push((signal, value));
    }
}
