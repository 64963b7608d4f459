use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures::ready;
use tokio::sync::oneshot;

use crate::ChannelError;
use crate::Error;
use crate::Result;

/// Result of a completed asynchronous transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// The submitted buffer, handed back; for reads the first `transferred` bytes are filled
    pub buffer: Vec<u8>,
    pub transferred: usize,
}

impl TransferOutcome {
    /// Bytes actually moved, as a slice of the buffer
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.transferred]
    }
}

/// Notified on the executor thread when an asynchronous transfer finishes
///
/// The attachment is the caller's context object, passed back untouched.
/// Panics raised by a handler are caught and logged.
pub trait CompletionHandler<A>: Send + 'static {
    fn completed(
        &self,
        transferred: usize,
        attachment: &A,
    );

    fn failed(
        &self,
        error: &Error,
        attachment: &A,
    );
}

/// Pending asynchronous transfer
///
/// Await it from async code, or call [`TransferHandle::wait`] from a plain
/// thread. Resolves to [`ChannelError::Cancelled`] if the transfer was discarded
/// by a forced channel shutdown.
#[must_use = "dropping the handle does not cancel the transfer, but loses its result"]
#[derive(Debug)]
pub struct TransferHandle {
    receiver: oneshot::Receiver<Result<TransferOutcome>>,
}

impl TransferHandle {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<TransferOutcome>>) -> Self {
        Self { receiver }
    }

    /// Blocks the current thread until the transfer finishes.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context; await
    /// the handle there instead.
    pub fn wait(self) -> Result<TransferOutcome> {
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(ChannelError::Cancelled.into()))
    }
}

impl Future for TransferHandle {
    type Output = Result<TransferOutcome>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        let received = ready!(Pin::new(&mut self.receiver).poll(cx));
        Poll::Ready(received.unwrap_or_else(|_| Err(ChannelError::Cancelled.into())))
    }
}
