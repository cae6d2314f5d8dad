//! Server configuration.

use crate::ids::DEFAULT_ID_LENGTH;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Runtime settings for the session server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    host: String,

    /// TCP port to bind.
    port: u16,

    /// Sessions older than this many seconds are reaped.
    retention_secs: u64,

    /// Seconds between reaper sweeps.
    sweep_interval_secs: u64,

    /// Characters in a generated session id.
    session_id_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            retention_secs: 60 * 60,
            sweep_interval_secs: 10 * 60,
            session_id_length: DEFAULT_ID_LENGTH,
        }
    }
}

/// Values that replace whatever the file or defaults supplied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replacement host.
    pub host: Option<String>,
    /// Replacement port.
    pub port: Option<u16>,
    /// Replacement retention window.
    pub retention_secs: Option<u64>,
    /// Replacement sweep interval.
    pub sweep_interval_secs: Option<u64>,
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        config.validate()
    }

    /// Applies command-line or environment overrides.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(secs) = overrides.retention_secs {
            self.retention_secs = secs;
        }
        if let Some(secs) = overrides.sweep_interval_secs {
            self.sweep_interval_secs = secs;
        }
        self
    }

    /// Rejects settings the server cannot run with.
    #[instrument(skip(self))]
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.retention_secs == 0 {
            return Err(ConfigError::new("retention_secs must be positive"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::new("sweep_interval_secs must be positive"));
        }
        if !(4..=32).contains(&self.session_id_length) {
            return Err(ConfigError::new(format!(
                "session_id_length must be between 4 and 32, got {}",
                self.session_id_length
            )));
        }
        Ok(self)
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Maximum session age.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Reaper period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
