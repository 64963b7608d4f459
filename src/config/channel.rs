use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Defaults applied to device channels when they are created
///
/// Both directions share one delay unit (microseconds). Output-only fields are
/// ignored by input channels.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChannelSettings {
    /// Retry short transfers until the buffer is filled/drained
    #[serde(default)]
    pub exact_mode: bool,

    /// Raw transfer attempts per exact-mode operation (None means unbounded)
    #[serde(default)]
    pub exact_attempts: Option<u64>,

    /// Pause between exact-mode attempts, in microseconds
    #[serde(default = "default_exact_delay_us")]
    pub exact_delay_us: u64,

    /// Upper bound for a single raw write in exact mode (None or 0 disables chunking)
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Grace period for in-flight asynchronous transfers when a channel closes (milliseconds)
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            exact_mode: false,
            exact_attempts: None,
            exact_delay_us: default_exact_delay_us(),
            chunk_size: None,
            close_grace_ms: default_close_grace_ms(),
        }
    }
}

impl ChannelSettings {
    pub fn exact_delay(&self) -> Duration {
        Duration::from_micros(self.exact_delay_us)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub(super) fn validate(&self) -> Result<()> {
        if self.exact_attempts == Some(0) {
            return Err(Error::Config(ConfigError::Message(
                "exact_attempts must be > 0 (omit it for unbounded attempts)".into(),
            )));
        }

        if self.close_grace_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "close_grace_ms must be at least 1ms".into(),
            )));
        }

        Ok(())
    }
}

fn default_exact_delay_us() -> u64 {
    1
}
// in ms
fn default_close_grace_ms() -> u64 {
    300_000
}
