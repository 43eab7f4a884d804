//! Monitor configuration file.
//!
//! A single TOML file carries the polling settings and every alert
//! configuration:
//!
//! ```toml
//! [monitor]
//! poll_interval_secs = 30
//! history_limit = 24
//!
//! [[configuration]]
//! station_id = 1
//! station_name = "Río Claro - Puente Norte"
//! sensor_type = "water_level"
//! sensor_unit = "m"
//!
//! [[configuration.threshold]]
//! level = "critical"
//! max_value = 3.0
//! persistence_time = 15
//! ```
//!
//! The path comes from the command line, else `RIOCLARO_CONFIG` (a `.env`
//! file is honoured), else `./rioclaro.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::stalenesses::DEFAULT_STALE_AFTER_MINUTES;
use crate::logging::LogLevel;
use crate::model::{AlertConfiguration, ConfigError};
use crate::stations::AlertRegistry;

pub const DEFAULT_CONFIG_PATH: &str = "./rioclaro.toml";
pub const CONFIG_ENV_VAR: &str = "RIOCLARO_CONFIG";

/// Dashboard refresh cadence for sensor previews.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Readings kept per stream; the preview chart shows the last 24.
pub const DEFAULT_HISTORY_LIMIT: usize = 24;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The `[monitor]` table. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_secs: u64,
    pub history_limit: usize,
    pub stale_after_minutes: u64,
    pub log_level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
            log_level: "info".to_string(),
            log_file: None,
            console_timestamps: true,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Parsed `log_level`; unrecognised values fall back to `Info`.
    pub fn log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    monitor: MonitorSettings,
    #[serde(default, rename = "configuration")]
    configurations: Vec<AlertConfiguration>,
}

/// Fully loaded configuration: settings plus a validated registry.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub settings: MonitorSettings,
    pub registry: AlertRegistry,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Resolves the config file path: `explicit`, else `RIOCLARO_CONFIG`, else
/// [`DEFAULT_CONFIG_PATH`].
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    dotenv::dotenv().ok();
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Parses configuration text and validates every alert configuration.
pub fn parse_config(text: &str) -> Result<MonitorConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text)?;
    if file.monitor.history_limit == 0 {
        return Err(ConfigError::InvalidHistoryLimit);
    }
    let registry = AlertRegistry::from_configurations(file.configurations)?;
    Ok(MonitorConfig {
        settings: file.monitor,
        registry,
    })
}

/// Reads and parses the config file at `path`.
pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    parse_config(&read_file(path)?)
}

/// Reads the alert configurations at `path` without validating them, for
/// verification reports.
pub fn read_configurations(path: &Path) -> Result<Vec<AlertConfiguration>, ConfigError> {
    let file: ConfigFile = toml::from_str(&read_file(path)?)?;
    Ok(file.configurations)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
