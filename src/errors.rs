//! Device I/O Error Hierarchy
//!
//! Defines the error types for device channels, the signal watcher and the
//! device composition layer, categorized by the component that raises them.

use std::fmt;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Channel-level failures (single-flight violations, closed channels)
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Failures raised by the underlying transport primitive
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Signal watcher lifecycle failures
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    /// Device composition failures
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Transfer direction of a device channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A same-direction transfer is already in flight on this channel
    #[error("{direction} transfer is already in progress")]
    ConcurrentAccess { direction: Direction },

    /// The channel has been closed
    #[error("{direction} channel is closed")]
    ChannelClosed { direction: Direction },

    /// Queued transfer was dropped by a forced executor shutdown
    #[error("Transfer cancelled before completion")]
    Cancelled,

    /// Executor worker thread could not be spawned
    #[error("Failed to spawn {direction} executor: {source}")]
    ExecutorSpawn {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// OS-level I/O failures on the device handle
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Device reported a failure of its own
    #[error("Device failure: {0}")]
    Device(String),

    /// Primitive claimed to move more bytes than it was offered
    #[error("Transport reported {reported} bytes for a {offered} byte slice")]
    Overrun { offered: usize, reported: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// The detection loop went away while a registry mutation awaited it
    #[error("Signal watcher loop terminated before acknowledging quiescence")]
    QuiesceInterrupted,

    /// Detection loop or dispatch worker thread could not be spawned
    #[error("Failed to spawn watcher thread: {0}")]
    LoopSpawn(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device has already been closed
    #[error("Device {name} is closed")]
    DeviceClosed { name: String },

    /// Signal line does not support the requested direction
    #[error("Signal {signal} cannot be used as {direction} pin")]
    InvalidSignal { signal: String, direction: Direction },

    /// Empty or otherwise unusable device name
    #[error("Invalid device name: {0:?}")]
    InvalidDeviceName(String),

    /// Name does not denote a serial control line
    #[error("Unknown signal name: {0:?}")]
    UnknownSignal(String),

    /// One or more devices failed to close during registry shutdown
    #[error("Failed to close {} device(s): {}", .failures.len(), .failures.join("; "))]
    Shutdown { failures: Vec<String> },
}

// ============== Conversion Implementations ============== //
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(TransportError::Io(e))
    }
}

impl Error {
    /// True if the error is a single-flight rejection
    pub fn is_concurrent_access(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::ConcurrentAccess { .. }))
    }

    /// True if the error originates from the transport primitive
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
