//! Settings for the demo programs, read from an optional TOML file.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a config file when no path is given on the command line.
pub const CONFIG_ENV: &str = "CHANNEL_DEMO_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Knobs for the demo programs. Every field has a default, so an empty file is
/// a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Values produced by the drain and select demos.
    pub count: u32,
    /// Increment between values in the select demo.
    pub step: i64,
    /// Pause after each send in the drain demos.
    pub producer_delay_ms: u64,
    /// Pause around each receive in the handoff demo.
    pub handoff_delay_ms: u64,
    pub quiet: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            count: 10,
            step: 2,
            producer_delay_ms: 1000,
            handoff_delay_ms: 2000,
            quiet: false,
        }
    }
}

impl DemoConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Loads the config named by the first command line argument, or by
    /// `CHANNEL_DEMO_CONFIG`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::args_os()
            .nth(1)
            .or_else(|| env::var_os(CONFIG_ENV))
            .map(PathBuf::from);
        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::Invalid {
                field: "count",
                reason: "must produce at least one value".to_string(),
            });
        }
        if self.step == 0 {
            return Err(ConfigError::Invalid {
                field: "step",
                reason: "must not be zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn producer_delay(&self) -> Duration {
        Duration::from_millis(self.producer_delay_ms)
    }

    pub fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }

    /// Same config without any pauses, for running demos in tests.
    pub fn without_delays(mut self) -> Self {
        self.producer_delay_ms = 0;
        self.handoff_delay_ms = 0;
        self
    }
}
