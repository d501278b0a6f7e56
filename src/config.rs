//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub replay: ReplayConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Which record source feeds the pipeline
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Live XBee serial link
    #[default]
    Serial,
    /// Wide-table mission CSV replay
    Replay,
}

/// Input source selection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    #[serde(default)]
    pub source: InputSource,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// CSV replay source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    #[serde(default = "default_replay_path")]
    pub path: String,

    #[serde(default = "default_replay_interval_ms")]
    pub interval_ms: u64,
}

/// Threshold & anomaly monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    #[serde(default = "default_sigma_factor")]
    pub sigma_factor: f64,
}

/// Mission log store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 9600 }
fn default_read_timeout_ms() -> u64 { 1000 }

fn default_replay_path() -> String { "mission_profile_telemetry.csv".to_string() }
fn default_replay_interval_ms() -> u64 { 1000 }

fn default_window_capacity() -> usize { 20 }
fn default_min_samples() -> usize { 5 }
fn default_sigma_factor() -> f64 { 2.5 }

fn default_log_path() -> String { "mission_logs.csv".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: default_replay_path(),
            interval_ms: default_replay_interval_ms(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            min_samples: default_min_samples(),
            sigma_factor: default_sigma_factor(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200")
            ));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 10000 {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("read_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.input.source == InputSource::Replay && self.replay.path.is_empty() {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("replay path cannot be empty when the replay source is selected")
            ));
        }

        if self.replay.interval_ms > 60000 {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("replay interval_ms must be at most 60000")
            ));
        }

        if self.monitor.window_capacity == 0 {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("monitor window_capacity must be greater than 0")
            ));
        }

        if self.monitor.min_samples < 2 || self.monitor.min_samples > self.monitor.window_capacity {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("monitor min_samples must be between 2 and window_capacity")
            ));
        }

        if self.monitor.sigma_factor <= 0.0 {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("monitor sigma_factor must be greater than 0")
            ));
        }

        if self.log.path.is_empty() {
            return Err(crate::error::GroundLinkError::Config(
                toml::de::Error::custom("log path cannot be empty")
            ));
        }

        Ok(())
    }
}
