//! This module is the hardware abstraction boundary.
//!
//! A [`Transport`] is the synchronous, possibly-partial primitive supplied by a
//! native serial/GPIO backend. Everything above it (channels, exact-mode retry,
//! signal watching) is built in this crate; nothing below it is.

mod adapters;
mod snapshot;
pub use adapters::*;
pub use snapshot::*;


#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Identifier of a boolean control line as understood by the transport
pub type SignalId = u32;

// Trait definition of the current module
// -----------------------------------------------------------------------------
// Core model: Transport Primitive
//

#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync + 'static {
    /// Reads at most `dst.len()` bytes into the front of `dst`.
    ///
    /// Blocks until the device produces data or its own read timeout fires.
    /// Short reads are normal and `Ok(0)` is a valid answer.
    fn sync_read(
        &self,
        dst: &mut [u8],
    ) -> Result<usize>;

    /// Writes at most `src.len()` bytes from the front of `src`.
    ///
    /// May write fewer bytes than offered.
    fn sync_write(
        &self,
        src: &[u8],
    ) -> Result<usize>;

    /// Arms change detection for exactly this set of signal ids, replacing any
    /// previously watched set.
    fn prepare_signal_watch(
        &self,
        signals: &[SignalId],
    ) -> Result<()>;

    /// Blocks until at least one watched signal changes or [`Transport::cancel_wait`]
    /// is called. A cancelled wait returns an empty snapshot.
    fn blocking_wait_for_change(&self) -> Result<SignalSnapshot>;

    /// Unblocks a pending [`Transport::blocking_wait_for_change`]. Callable from any thread.
    fn cancel_wait(&self);

    /// Current level of a control line
    fn query_signal(
        &self,
        signal: SignalId,
    ) -> Result<bool>;

    /// Drives an output control line
    fn set_signal(
        &self,
        signal: SignalId,
        value: bool,
    ) -> Result<()>;

    /// Releases the device handle. Called once by the owning device on close.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
