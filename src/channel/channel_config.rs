use std::time::Duration;

use crate::ChannelSettings;

/// Per-channel transfer policy
///
/// Snapshotted when an operation starts: changing it never affects a transfer
/// that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Retry short transfers until the buffer is filled/drained
    pub exact_mode: bool,

    /// Raw attempts per operation in exact mode; `None` is unbounded
    pub exact_attempts: Option<u64>,

    /// Pause before every exact-mode attempt except the first
    pub exact_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from(&ChannelSettings::default())
    }
}

impl From<&ChannelSettings> for ChannelConfig {
    fn from(settings: &ChannelSettings) -> Self {
        Self {
            exact_mode: settings.exact_mode,
            exact_attempts: settings.exact_attempts,
            exact_delay: settings.exact_delay(),
        }
    }
}

/// Output channels additionally bound the size of each raw write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputConfig {
    pub channel: ChannelConfig,

    /// Exact-mode chunk bound; `None` or `Some(0)` writes the whole remainder
    pub chunk_size: Option<usize>,
}

impl OutputConfig {
    /// Effective chunk bound, with `Some(0)` folded into `None`
    pub(crate) fn chunk_limit(&self) -> Option<usize> {
        self.chunk_size.filter(|size| *size > 0)
    }
}

impl From<&ChannelSettings> for OutputConfig {
    fn from(settings: &ChannelSettings) -> Self {
        Self {
            channel: ChannelConfig::from(settings),
            chunk_size: settings.chunk_size,
        }
    }
}
