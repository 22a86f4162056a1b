//! Monitor configuration
//!
//! Stored as JSON. Every field has a default, so a config file only needs
//! the values that differ (usually just the port name).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::channel::Channel;
use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, DEFAULT_WINDOW_LEN, MAX_FRAME_SIZE};

/// Default serial device of the acquisition board
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyS5";

/// Default render interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Settings for the acquisition pipeline and the monitor around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Samples per channel window
    pub window_len: usize,
    /// Time allowed for one frame to arrive, in milliseconds
    pub read_timeout_ms: u64,
    /// Render interval in milliseconds
    pub tick_interval_ms: u64,
    /// Largest frame accepted, in bytes
    pub max_frame_len: usize,
    /// Use the built-in demo device instead of a serial port
    pub demo: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            window_len: DEFAULT_WINDOW_LEN,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_frame_len: MAX_FRAME_SIZE,
            demo: false,
        }
    }
}

impl MonitorConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_len == 0 {
            return Err(ConfigError::Invalid("window_len must be positive".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.max_frame_len < self.min_frame_len() {
            return Err(ConfigError::Invalid(format!(
                "max_frame_len {} cannot hold a full frame of {} samples per channel",
                self.max_frame_len, self.window_len
            )));
        }
        Ok(())
    }

    /// Smallest possible full frame: tag, separator and one digit plus separator per sample
    fn min_frame_len(&self) -> usize {
        self.window_len
            .saturating_mul(2)
            .saturating_add(3)
            .saturating_mul(Channel::ACQUIRED.len())
    }

    /// Frame read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Render interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
