//! Device channels.
//!
//! A channel wraps a raw, possibly-partial transfer primitive with:
//! - single-flight enforcement per direction (a second concurrent transfer is
//!   rejected, never queued)
//! - exact mode: bounded retry until the buffer is filled/drained
//! - optional write chunking
//! - a blocking entry point and a future-returning one backed by a private,
//!   lazily created single-worker executor
//!
//! Input and output directions are independent and may run concurrently.

mod channel_config;
mod exact;
mod executor;
mod guard;
mod handle;
mod input_channel;
mod lifecycle;
mod output_channel;

pub use channel_config::*;
pub use exact::*;
pub use handle::*;
pub use input_channel::*;
pub use output_channel::*;

#[cfg(test)]
mod output_channel_test;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Raw read capability a channel is built on
#[cfg_attr(test, automock)]
pub trait RawInput: Send + Sync + 'static {
    /// One primitive read into the front of `dst`; may be short, zero is valid
    fn raw_read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize>;

    /// Direction-specific cleanup, run once when the channel closes
    fn close_input(&self) -> Result<()> {
        Ok(())
    }
}

/// Raw write capability a channel is built on
#[cfg_attr(test, automock)]
pub trait RawOutput: Send + Sync + 'static {
    /// One primitive write from the front of `src`; may be short
    fn raw_write(
        &self,
        src: &[u8],
    ) -> Result<usize>;

    /// Direction-specific cleanup, run once when the channel closes
    fn close_output(&self) -> Result<()> {
        Ok(())
    }
}

type Notify = Box<dyn FnOnce(&Result<usize>) + Send + 'static>;

/// Adapts a [`CompletionHandler`] and its attachment into a one-shot notification
fn completion_notice<A, H>(
    attachment: A,
    handler: H,
) -> Notify
where
    A: Send + 'static,
    H: CompletionHandler<A>,
{
    Box::new(move |result: &Result<usize>| match result {
        Ok(transferred) => handler.completed(*transferred, &attachment),
        Err(error) => handler.failed(error, &attachment),
    })
}

fn notify(
    notice: Option<Notify>,
    result: &Result<usize>,
) {
    if let Some(notice) = notice {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| notice(result)));
        if outcome.is_err() {
            tracing::error!("completion handler panicked; ignoring");
        }
    }
}
