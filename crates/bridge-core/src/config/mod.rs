//! Configuration management for Bridge.
//!
//! This module handles loading, saving, and validating Bridge configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/bridge/config.toml` |
//! | macOS | `~/Library/Application Support/com.bridge.Bridge/config.toml` |
//! | Windows | `%APPDATA%\Bridge\Bridge\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Listening port: {}", config.network.port);
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest accepted chunk size (16 MB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration struct for Bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub network: NetworkConfig,
    /// Transfer settings
    pub transfer: TransferSettings,
    /// Receive settings
    pub receive: ReceiveConfig,
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Port the receiver listens on and the sender dials by default
    pub port: u16,
    /// Address the receiver binds to
    pub listen_address: IpAddr,
    /// How long the sender waits for the connection to open
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// How long the receiver waits for a complete header
    #[serde(with = "humantime_serde")]
    pub header_timeout: Duration,
    /// Enable TCP keep-alive probes
    pub keepalive: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            connect_timeout: crate::DEFAULT_CONNECT_TIMEOUT,
            header_timeout: crate::DEFAULT_HEADER_TIMEOUT,
            keepalive: true,
        }
    }
}

/// Transfer configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Chunk size for reads and writes
    pub chunk_size: usize,
    /// Delete the partial file when a receive fails
    pub remove_partial: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            remove_partial: false,
        }
    }
}

/// Receive configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Default output directory for received files
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or holds invalid values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, usually [`Config::config_path`].
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        std::fs::write(path, self.to_toml()?)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Serialize configuration to TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, reason: &str| Error::InvalidConfig {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if self.transfer.chunk_size == 0 {
            return Err(invalid("transfer.chunk_size", "must be greater than zero"));
        }
        if self.transfer.chunk_size > MAX_CHUNK_SIZE {
            return Err(invalid("transfer.chunk_size", "must be at most 16 MB"));
        }
        if self.network.connect_timeout.is_zero() {
            return Err(invalid("network.connect_timeout", "must be greater than zero"));
        }
        if self.network.header_timeout.is_zero() {
            return Err(invalid("network.header_timeout", "must be greater than zero"));
        }
        Ok(())
    }

    /// Build the engine configuration from these settings.
    #[must_use]
    pub fn transfer_config(&self) -> crate::transfer::TransferConfig {
        crate::transfer::TransferConfig {
            chunk_size: self.transfer.chunk_size,
            connect_timeout: self.network.connect_timeout,
            header_timeout: self.network.header_timeout,
            keepalive: self.network.keepalive,
            remove_partial: self.transfer.remove_partial,
        }
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bridge", "Bridge")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix('s')
            .map(|secs| {
                secs.parse()
                    .map(Duration::from_secs)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}
