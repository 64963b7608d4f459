use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::ChannelError;
use crate::Direction;
use crate::Result;

/// Single-flight flag of one channel direction
#[derive(Debug, Default)]
pub(crate) struct ActiveFlag {
    active: Arc<AtomicBool>,
}

impl ActiveFlag {
    /// Marks the direction active, or rejects the caller if a transfer is already running.
    /// Never queues.
    pub(crate) fn try_acquire(
        &self,
        direction: Direction,
    ) -> Result<ActiveGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChannelError::ConcurrentAccess { direction })?;

        Ok(ActiveGuard {
            active: self.active.clone(),
        })
    }

    /// Racy snapshot, for diagnostics only
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Clears the flag when dropped, including during unwinding and when a queued job is discarded
#[derive(Debug)]
pub(crate) struct ActiveGuard {
    active: Arc<AtomicBool>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
