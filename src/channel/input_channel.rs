use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::completion_notice;
use super::exact_read;
use super::guard::ActiveFlag;
use super::lifecycle::ChannelLifecycle;
use super::ChannelConfig;
use super::CompletionHandler;
use super::Notify;
use super::RawInput;
use super::TransferHandle;
use crate::constants::INPUT_EXECUTOR_THREAD;
use crate::Direction;
use crate::Result;

/// Reading side of a device
pub struct InputChannel<R: RawInput> {
    raw: Arc<R>,
    config: RwLock<ChannelConfig>,
    active: ActiveFlag,
    lifecycle: ChannelLifecycle,
}

impl<R: RawInput> InputChannel<R> {
    /// # Arguments
    /// * `close_grace` - how long `close()` waits for an in-flight asynchronous read
    pub fn new(
        raw: R,
        config: ChannelConfig,
        close_grace: Duration,
    ) -> Self {
        Self {
            raw: Arc::new(raw),
            config: RwLock::new(config),
            active: ActiveFlag::default(),
            lifecycle: ChannelLifecycle::new(Direction::Input, INPUT_EXECUTOR_THREAD, close_grace),
        }
    }

    pub fn config(&self) -> ChannelConfig {
        *self.config.read()
    }

    /// Replaces the whole policy; applies from the next read on
    pub fn configure(
        &self,
        config: ChannelConfig,
    ) {
        *self.config.write() = config;
    }

    pub fn set_exact_mode(
        &self,
        exact_mode: bool,
    ) {
        self.config.write().exact_mode = exact_mode;
    }

    /// `None` means unbounded
    pub fn set_exact_attempts(
        &self,
        exact_attempts: Option<u64>,
    ) {
        self.config.write().exact_attempts = exact_attempts;
    }

    pub fn set_exact_delay(
        &self,
        exact_delay: Duration,
    ) {
        self.config.write().exact_delay = exact_delay;
    }

    /// Whether a read is in flight. A racy snapshot, for diagnostics only.
    pub fn is_active(&self) -> bool {
        self.active.is_active()
    }

    pub fn is_open(&self) -> bool {
        !self.lifecycle.is_closed()
    }

    /// Blocking read into `dst`, returning the number of bytes read.
    ///
    /// # Errors
    /// - `ChannelError::ConcurrentAccess` if another read on this channel is in flight
    /// - `ChannelError::ChannelClosed` after `close()`
    /// - any transport error, unretried
    pub fn read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize> {
        self.lifecycle.ensure_open()?;
        let _guard = self.active.try_acquire(Direction::Input)?;
        let config = self.config();

        exact_read(&config, dst, |buf| self.raw.raw_read(buf))
    }

    /// Submits a read into `dst` to the channel's executor.
    ///
    /// The single-flight check happens here, synchronously. The handle resolves
    /// with the buffer and the number of bytes read, or with the failure.
    pub fn read_async(
        &self,
        dst: Vec<u8>,
    ) -> Result<TransferHandle> {
        self.submit(dst, None)
    }

    /// Like [`InputChannel::read_async`], additionally notifying `handler` with
    /// `attachment` on the executor thread.
    pub fn read_async_with<A, H>(
        &self,
        dst: Vec<u8>,
        attachment: A,
        handler: H,
    ) -> Result<TransferHandle>
    where
        A: Send + 'static,
        H: CompletionHandler<A>,
    {
        self.submit(dst, Some(completion_notice(attachment, handler)))
    }

    fn submit(
        &self,
        dst: Vec<u8>,
        notice: Option<Notify>,
    ) -> Result<TransferHandle> {
        let config = self.config();
        let raw = self.raw.clone();
        self.lifecycle.submit_transfer(&self.active, dst, notice, move |buf| {
            exact_read(&config, buf, |chunk| raw.raw_read(chunk))
        })
    }

    /// Stops the executor (bounded by the close grace period, then forced) and
    /// runs the input cleanup hook. Later calls do nothing.
    pub fn close(&self) -> Result<()> {
        if !self.lifecycle.close() {
            return Ok(());
        }
        self.raw.close_input()
    }
}
