//! Device channels and signal watching over a synchronous hardware transport.
//!
//! - [`InputChannel`] / [`OutputChannel`]: single-flight byte transfers with
//!   exact-mode retry, write chunking and future-based submission
//! - [`SignalWatcher`]: background detection of control-line changes, fanned out
//!   to [`SignalListener`]s
//! - [`SerialDevice`] / [`DeviceRegistry`]: the two composed over one
//!   [`Transport`] per device

mod channel;
mod config;
mod constants;
mod device;
mod errors;
mod transport;
mod utils;
mod watch;

pub use channel::*;
pub use config::*;
pub use device::*;
pub use errors::*;
pub use transport::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
