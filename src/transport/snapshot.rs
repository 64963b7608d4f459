use std::collections::HashMap;

use super::SignalId;

/// Signal levels reported by one detection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSnapshot {
    entries: Vec<(SignalId, bool)>,
}

impl SignalSnapshot {
    pub fn new(entries: Vec<(SignalId, bool)>) -> Self {
        Self { entries }
    }

    /// Snapshot returned by a cancelled wait
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(SignalId, bool)] {
        &self.entries
    }
}

/// Last known level per signal, used to turn snapshots into change events
#[derive(Debug, Default)]
pub(crate) struct SignalBaseline {
    levels: HashMap<SignalId, bool>,
}

impl SignalBaseline {
    /// Returns the entries of `snapshot` that differ from the baseline and
    /// records them. A signal seen for the first time counts as changed. When
    /// a snapshot repeats an id, the last entry wins.
    pub(crate) fn delta(
        &mut self,
        snapshot: &SignalSnapshot,
    ) -> Vec<(SignalId, bool)> {
        let mut latest: Vec<(SignalId, bool)> = Vec::with_capacity(snapshot.len());
        for &(id, value) in snapshot.entries() {
            match latest.iter_mut().find(|(seen, _)| *seen == id) {
                Some(entry) => entry.1 = value,
                None => latest.push((id, value)),
            }
        }

        latest
            .into_iter()
            .filter(|&(id, value)| self.levels.insert(id, value) != Some(value))
            .collect()
    }

    /// Forgets every level; the next report of each signal counts as a change
    pub(crate) fn clear(&mut self) {
        self.levels.clear();
    }
}
