use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;

use super::executor::Job;
use super::executor::TaskExecutor;
use super::guard::ActiveFlag;
use super::notify;
use super::Notify;
use super::TransferHandle;
use super::TransferOutcome;
use crate::ChannelError;
use crate::Direction;
use crate::Result;

/// Open/closed state and the lazily created executor of one channel
pub(crate) struct ChannelLifecycle {
    direction: Direction,
    thread_name: &'static str,
    close_grace: Duration,
    closed: AtomicBool,
    executor: Mutex<Option<TaskExecutor>>,
}

impl ChannelLifecycle {
    pub(crate) fn new(
        direction: Direction,
        thread_name: &'static str,
        close_grace: Duration,
    ) -> Self {
        Self {
            direction,
            thread_name,
            close_grace,
            closed: AtomicBool::new(false),
            executor: Mutex::new(None),
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ChannelError::ChannelClosed {
                direction: self.direction,
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `job` on the channel's executor, creating the executor on first use
    pub(crate) fn submit(
        &self,
        job: Job,
    ) -> Result<()> {
        let mut executor = self.executor.lock();
        // re-checked under the lock so close() cannot slip in between
        self.ensure_open()?;

        if executor.is_none() {
            debug!("starting {} executor", self.direction);
            let spawned = TaskExecutor::spawn(self.thread_name).map_err(|source| ChannelError::ExecutorSpawn {
                direction: self.direction,
                source,
            })?;
            *executor = Some(spawned);
        }

        match executor.as_ref() {
            Some(executor) => executor.execute(job).map_err(|_rejected| {
                ChannelError::ChannelClosed {
                    direction: self.direction,
                }
                .into()
            }),
            None => Err(ChannelError::ChannelClosed {
                direction: self.direction,
            }
            .into()),
        }
    }

    /// Queues one asynchronous transfer over `buffer`.
    ///
    /// The single-flight check on `active` happens here, synchronously; the
    /// guard travels with the job and is released before `notice` runs.
    pub(crate) fn submit_transfer<F>(
        &self,
        active: &ActiveFlag,
        mut buffer: Vec<u8>,
        notice: Option<Notify>,
        transfer: F,
    ) -> Result<TransferHandle>
    where
        F: FnOnce(&mut [u8]) -> Result<usize> + Send + 'static,
    {
        self.ensure_open()?;
        let guard = active.try_acquire(self.direction)?;
        let direction = self.direction;
        let (sender, receiver) = oneshot::channel();

        self.submit(Box::new(move || {
            let result = transfer(&mut buffer);
            // released before notifying so the handler may start the next transfer
            drop(guard);
            notify(notice, &result);

            let outcome = result.map(|transferred| TransferOutcome { buffer, transferred });
            if sender.send(outcome).is_err() {
                trace!("{} handle dropped before completion", direction);
            }
        }))?;

        Ok(TransferHandle::new(receiver))
    }

    /// Marks the channel closed and stops its executor within the grace period.
    ///
    /// Returns `false` if the channel was already closed.
    pub(crate) fn close(&self) -> bool {
        let executor = {
            let mut executor = self.executor.lock();
            if self.closed.swap(true, Ordering::AcqRel) {
                return false;
            }
            executor.take()
        };

        if let Some(executor) = executor {
            executor.shutdown(self.close_grace);
        }
        debug!("{} channel closed", self.direction);
        true
    }
}
