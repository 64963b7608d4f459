use std::collections::BTreeMap;
use std::sync::Arc;

use super::SignalListener;
use crate::SignalId;

/// Listeners per signal id, in registration order; the same listener may be
/// registered more than once
#[derive(Clone, Default)]
pub struct SignalRegistry {
    entries: BTreeMap<SignalId, Vec<Arc<dyn SignalListener>>>,
}

impl SignalRegistry {
    pub fn add(
        &mut self,
        signal: SignalId,
        listener: Arc<dyn SignalListener>,
    ) {
        self.entries.entry(signal).or_default().push(listener);
    }

    /// Removes the first registration of `listener` on `signal`. Signals left
    /// without listeners are dropped from the monitored set.
    pub fn remove(
        &mut self,
        signal: SignalId,
        listener: &Arc<dyn SignalListener>,
    ) -> bool {
        let Some(listeners) = self.entries.get_mut(&signal) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        listeners.remove(position);
        if listeners.is_empty() {
            self.entries.remove(&signal);
        }
        true
    }

    /// Snapshot of the listeners of one signal
    pub fn listeners(
        &self,
        signal: SignalId,
    ) -> Vec<Arc<dyn SignalListener>> {
        self.entries.get(&signal).cloned().unwrap_or_default()
    }

    pub fn listener_count(
        &self,
        signal: SignalId,
    ) -> usize {
        self.entries.get(&signal).map_or(0, Vec::len)
    }

    /// Monitored signal ids, ascending
    pub fn signals(&self) -> Vec<SignalId> {
        self.entries.keys().copied().collect()
    }

    pub fn signal_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
