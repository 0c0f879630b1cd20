//! Configuration loading and management.
//!
//! The collector needs three values to get on chat: the channel list, the
//! account name and the credential token. They are read from a TOML file at
//! startup and written back once a join has been confirmed, so a
//! successfully used configuration survives for the next run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Standard chat server endpoint, used when the config does not override it.
pub const DEFAULT_SERVER: &str = "irc.twitch.tv:6667";

/// Collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat server `host:port`.
    #[serde(default = "default_server")]
    pub server: String,
    /// Account name used for NICK/USER registration.
    pub nick: String,
    /// OAuth credential token sent as the PASS line.
    pub token: String,
    /// Channel list, comma-separated.
    pub channel: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_owned()
}

impl Config {
    /// Load the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Write the configuration back out.
    ///
    /// Called after the first confirmed join, not before: a config that
    /// never connected successfully is not worth persisting.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// The configured channels, split on commas and trimmed.
    pub fn channels(&self) -> Vec<String> {
        self.channel
            .split(',')
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect()
    }
}
