use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Tuning for the signal watcher loop and its dispatch pool
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherSettings {
    /// Dispatch workers kept alive on top of one per monitored signal
    #[serde(default = "default_dispatch_headroom")]
    pub dispatch_headroom: usize,

    /// Idle time after which a dispatch worker above the floor exits (milliseconds)
    #[serde(default = "default_dispatch_keep_alive_ms")]
    pub dispatch_keep_alive_ms: u64,

    /// Bounded wait for the loop thread and dispatch pool on stop (milliseconds)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Interval at which a pending registry mutation re-cancels the transport wait (milliseconds)
    #[serde(default = "default_quiesce_retry_ms")]
    pub quiesce_retry_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            dispatch_headroom: default_dispatch_headroom(),
            dispatch_keep_alive_ms: default_dispatch_keep_alive_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            quiesce_retry_ms: default_quiesce_retry_ms(),
        }
    }
}

impl WatcherSettings {
    pub fn dispatch_keep_alive(&self) -> Duration {
        Duration::from_millis(self.dispatch_keep_alive_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn quiesce_retry(&self) -> Duration {
        Duration::from_millis(self.quiesce_retry_ms)
    }

    pub(super) fn validate(&self) -> Result<()> {
        if self.dispatch_keep_alive_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatch_keep_alive_ms must be at least 1ms".into(),
            )));
        }

        if self.shutdown_grace_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "shutdown_grace_ms must be at least 1ms".into(),
            )));
        }

        if self.quiesce_retry_ms == 0 || self.quiesce_retry_ms > self.shutdown_grace_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "quiesce_retry_ms {}ms must be within 1..={}ms",
                self.quiesce_retry_ms, self.shutdown_grace_ms
            ))));
        }

        Ok(())
    }
}

fn default_dispatch_headroom() -> usize {
    3
}
// in ms
fn default_dispatch_keep_alive_ms() -> u64 {
    60_000
}
fn default_shutdown_grace_ms() -> u64 {
    5_000
}
fn default_quiesce_retry_ms() -> u64 {
    5
}
