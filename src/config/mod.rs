//! Settings management for device channels and the signal watcher.
//!
//! Settings are loaded from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML file
//! 3. Environment variables (highest priority), e.g. `SIGLINE__CHANNEL__EXACT_MODE=true`
//!

mod channel;
mod watcher;
pub use channel::*;
pub use watcher::*;


//---
use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IoSettings {
    /// Defaults applied to every newly created device channel
    #[serde(default)]
    pub channel: ChannelSettings,

    /// Signal watcher and dispatch pool tuning
    #[serde(default)]
    pub watcher: WatcherSettings,
}

impl IoSettings {
    /// Load settings from hardcoded defaults, an optional TOML file and
    /// `SIGLINE__`-prefixed environment variables, in increasing priority.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML settings file; the file must exist when given
    ///
    /// # Returns
    /// Merged and validated settings
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.channel.validate()?;
        self.watcher.validate()?;
        Ok(())
    }
}
