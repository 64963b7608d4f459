use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::completion_notice;
use super::exact_write;
use super::guard::ActiveFlag;
use super::lifecycle::ChannelLifecycle;
use super::CompletionHandler;
use super::Notify;
use super::OutputConfig;
use super::RawOutput;
use super::TransferHandle;
use crate::constants::OUTPUT_EXECUTOR_THREAD;
use crate::Direction;
use crate::Result;

/// Writing side of a device
pub struct OutputChannel<W: RawOutput> {
    raw: Arc<W>,
    config: RwLock<OutputConfig>,
    active: ActiveFlag,
    lifecycle: ChannelLifecycle,
}

impl<W: RawOutput> OutputChannel<W> {
    pub fn new(
        raw: W,
        config: OutputConfig,
        close_grace: Duration,
    ) -> Self {
        Self {
            raw: Arc::new(raw),
            config: RwLock::new(config),
            active: ActiveFlag::default(),
            lifecycle: ChannelLifecycle::new(Direction::Output, OUTPUT_EXECUTOR_THREAD, close_grace),
        }
    }

    pub fn config(&self) -> OutputConfig {
        *self.config.read()
    }

    pub fn configure(
        &self,
        config: OutputConfig,
    ) {
        *self.config.write() = config;
    }

    pub fn set_exact_mode(
        &self,
        exact_mode: bool,
    ) {
        self.config.write().channel.exact_mode = exact_mode;
    }

    pub fn set_exact_attempts(
        &self,
        exact_attempts: Option<u64>,
    ) {
        self.config.write().channel.exact_attempts = exact_attempts;
    }

    pub fn set_exact_delay(
        &self,
        exact_delay: Duration,
    ) {
        self.config.write().channel.exact_delay = exact_delay;
    }

    /// `None` or `Some(0)` disables chunking
    pub fn set_chunk_size(
        &self,
        chunk_size: Option<usize>,
    ) {
        self.config.write().chunk_size = chunk_size;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_active()
    }

    pub fn is_open(&self) -> bool {
        !self.lifecycle.is_closed()
    }

    /// Blocking write of `src`, returning the number of bytes written.
    ///
    /// In exact mode a short count means the attempt budget ran out.
    pub fn write(
        &self,
        src: &[u8],
    ) -> Result<usize> {
        self.lifecycle.ensure_open()?;
        let _guard = self.active.try_acquire(Direction::Output)?;
        let config = self.config();

        exact_write(&config, src, |buf| self.raw.raw_write(buf))
    }

    pub fn write_async(
        &self,
        src: Vec<u8>,
    ) -> Result<TransferHandle> {
        self.submit(src, None)
    }

    pub fn write_async_with<A, H>(
        &self,
        src: Vec<u8>,
        attachment: A,
        handler: H,
    ) -> Result<TransferHandle>
    where
        A: Send + 'static,
        H: CompletionHandler<A>,
    {
        self.submit(src, Some(completion_notice(attachment, handler)))
    }

    fn submit(
        &self,
        src: Vec<u8>,
        notice: Option<Notify>,
    ) -> Result<TransferHandle> {
        let config = self.config();
        let raw = self.raw.clone();
        self.lifecycle.submit_transfer(&self.active, src, notice, move |buf| {
            exact_write(&config, buf, |chunk| raw.raw_write(chunk))
        })
    }

    pub fn close(&self) -> Result<()> {
        if !self.lifecycle.close() {
            return Ok(());
        }
        self.raw.close_output()
    }
}
