//! # Configuration Management Module
//!
//! Centralized, typed configuration for the capture tool with defaults for
//! every value, so a missing file or a missing section is never an error.
//!
//! ## Configuration Structure
//!
//! - [`DeviceConfig`] - Serial link, discovery and AT-command pacing
//! - [`ListenerConfig`] - Message log location and settle-window timing
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use air780e::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Log file: {}", config.listener.logfile);
//!     println!("Settle window: {:?}", config.listener.settle_window());
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [device]
//! port = ""                 # empty: discover via /dev/serial/by-id
//! baud_rate = 115200
//! descriptor_prefix = "usb-EigenComm_EigenComm_Compo"
//!
//! [listener]
//! logfile = "messages.jsonl"
//! settle_window_ms = 100
//!
//! [logging]
//! level = "info"
//! ```
//!
//! CLI arguments override the file, which overrides the defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Explicit serial device path. Empty means discover.
    pub port: String,
    pub baud_rate: u32,
    /// Directory of stable device symlinks scanned during discovery.
    pub by_id_dir: PathBuf,
    /// Only `by_id_dir` entries whose name starts with this are considered.
    pub descriptor_prefix: String,
    /// Required USB interface string (compared case-insensitively).
    pub interface: String,
    /// Root of the sysfs tty class, where the interface string is read.
    pub sysfs_tty_dir: PathBuf,
    /// Gap between initialization commands (ms).
    pub init_interval_ms: u64,
    /// Wait between the `AT+CMGS` header and the message body (ms).
    pub send_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115200,
            by_id_dir: PathBuf::from("/dev/serial/by-id"),
            descriptor_prefix: "usb-EigenComm_EigenComm_Compo".to_string(),
            interface: "AT".to_string(),
            sysfs_tty_dir: PathBuf::from("/sys/class/tty"),
            init_interval_ms: 500,
            send_delay_ms: 500,
        }
    }
}

impl DeviceConfig {
    /// The configured port, if one is set.
    pub fn explicit_port(&self) -> Option<&str> {
        let port = self.port.trim();
        (!port.is_empty()).then_some(port)
    }

    pub fn init_interval(&self) -> Duration {
        Duration::from_millis(self.init_interval_ms)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// JSON Lines message log.
    pub logfile: String,
    /// Idle gap that ends a burst of lines (ms).
    pub settle_window_ms: u64,
    /// Wait between discovery scans when no device is present (s).
    pub poll_interval_secs: u64,
    /// Wait after initialization before listening (ms).
    pub post_init_delay_ms: u64,
    /// Wait before restarting after a failed session (ms).
    pub restart_delay_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            logfile: "messages.jsonl".to_string(),
            settle_window_ms: 100,
            poll_interval_secs: 10,
            post_init_delay_ms: 1000,
            restart_delay_ms: 1000,
        }
    }
}

impl ListenerConfig {
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn post_init_delay(&self) -> Duration {
        Duration::from_millis(self.post_init_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unknown strings fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        Config::default().save(path).await
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
