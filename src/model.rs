//! Core data types for the RíoClaro alert monitor.
//!
//! This module defines the shared domain model imported by all other modules:
//! alert configurations and their thresholds, sensor readings, and the result
//! of one evaluation pass. It contains no evaluation logic and no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sensor types
// ---------------------------------------------------------------------------

/// Water level (stage), in metres.
pub const SENSOR_WATER_LEVEL: &str = "water_level";

/// Flow rate (discharge), in m³/s.
pub const SENSOR_FLOW_RATE: &str = "flow_rate";

/// Water temperature, in °C.
pub const SENSOR_TEMPERATURE: &str = "temperature";

/// Acidity, dimensionless pH.
pub const SENSOR_PH: &str = "ph";

/// Accumulated rainfall, in mm.
pub const SENSOR_RAINFALL: &str = "rainfall";

/// Sensor types known to the backend. Configurations may use other types;
/// the sensor registry is modular.
pub const KNOWN_SENSOR_TYPES: &[&str] = &[
    SENSOR_WATER_LEVEL,
    SENSOR_FLOW_RATE,
    SENSOR_TEMPERATURE,
    SENSOR_PH,
    SENSOR_RAINFALL,
];

// ---------------------------------------------------------------------------
// Threshold types
// ---------------------------------------------------------------------------

/// Severity of a configured threshold.
///
/// Declared in ascending order, so the derived `Ord` agrees with [`rank`]:
/// `Warning < Critical < Emergency`.
///
/// [`rank`]: ThresholdLevel::rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdLevel {
    Warning,
    Critical,
    Emergency,
}

impl ThresholdLevel {
    /// All levels, highest severity first.
    pub const BY_SEVERITY: [ThresholdLevel; 3] = [
        ThresholdLevel::Emergency,
        ThresholdLevel::Critical,
        ThresholdLevel::Warning,
    ];

    /// Severity rank: emergency 3, critical 2, warning 1.
    pub fn rank(self) -> u8 {
        match self {
            ThresholdLevel::Warning => 1,
            ThresholdLevel::Critical => 2,
            ThresholdLevel::Emergency => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdLevel::Warning => "warning",
            ThresholdLevel::Critical => "critical",
            ThresholdLevel::Emergency => "emergency",
        }
    }
}

impl fmt::Display for ThresholdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThresholdLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" => Ok(ThresholdLevel::Warning),
            "critical" => Ok(ThresholdLevel::Critical),
            "emergency" => Ok(ThresholdLevel::Emergency),
            _ => Err(format!("unknown threshold level: {s}")),
        }
    }
}

/// One configured alert rule for a sensor.
///
/// Every numeric field except the id is optional. A threshold with neither
/// `min_value` nor `max_value` is never breached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default)]
    pub id: u64,
    pub level: ThresholdLevel,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Slack subtracted from `min_value` and added to `max_value`.
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Minutes a breach must be sustained. Absent or `<= 0` means the latest
    /// value alone decides.
    #[serde(default)]
    pub persistence_time: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Threshold {
    /// A threshold at `level` with no bounds, active, no tolerance and no
    /// persistence. Intended as a starting point for struct update syntax.
    pub fn new(id: u64, level: ThresholdLevel) -> Self {
        Self {
            id,
            level,
            min_value: None,
            max_value: None,
            tolerance: None,
            persistence_time: None,
            is_active: true,
        }
    }

    pub fn has_bounds(&self) -> bool {
        self.min_value.is_some() || self.max_value.is_some()
    }

    /// Persistence window length in minutes, or `None` when the threshold
    /// resolves on the latest value alone.
    pub fn persistence_minutes(&self) -> Option<f64> {
        self.persistence_time.filter(|minutes| *minutes > 0.0)
    }
}

fn default_true() -> bool {
    true
}

/// Alert configuration for one (station, sensor type) pair.
///
/// Thresholds are created, edited and deleted as a batch whenever the
/// configuration is saved; see `stations::AlertRegistry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfiguration {
    #[serde(default)]
    pub id: u64,
    pub station_id: u64,
    #[serde(default)]
    pub station_name: Option<String>,
    pub sensor_type: String,
    pub sensor_unit: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, alias = "threshold")]
    pub thresholds: Vec<Threshold>,
}

impl AlertConfiguration {
    /// Active thresholds in configuration order.
    pub fn active_thresholds(&self) -> impl Iterator<Item = &Threshold> {
        self.thresholds.iter().filter(|t| t.is_active)
    }

    /// Station label for messages: the configured name, else `Estación <id>`.
    pub fn station_label(&self) -> String {
        self.station_name
            .clone()
            .unwrap_or_else(|| format!("Estación {}", self.station_id))
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// Quality flag attached to a measurement by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Fair,
    Poor,
}

/// A single sensor sample. Readings are immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub quality: Option<Quality>,
}

impl Reading {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            quality: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation types
// ---------------------------------------------------------------------------

/// Status of a sensor stream after one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// No configuration, or no data yet.
    Unknown,
    Normal,
    Warning,
    Critical,
    Emergency,
}

impl StatusLevel {
    /// `true` for the three breach states.
    pub fn is_breach(self) -> bool {
        matches!(
            self,
            StatusLevel::Warning | StatusLevel::Critical | StatusLevel::Emergency
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Unknown => "unknown",
            StatusLevel::Normal => "normal",
            StatusLevel::Warning => "warning",
            StatusLevel::Critical => "critical",
            StatusLevel::Emergency => "emergency",
        }
    }
}

impl From<ThresholdLevel> for StatusLevel {
    fn from(level: ThresholdLevel) -> Self {
        match level {
            ThresholdLevel::Warning => StatusLevel::Warning,
            ThresholdLevel::Critical => StatusLevel::Critical,
            ThresholdLevel::Emergency => StatusLevel::Emergency,
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one evaluation pass. Computed fresh on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub level: StatusLevel,
    pub message: String,
    pub matched_threshold: Option<Threshold>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while validating, storing or loading alert configurations.
///
/// Validation messages are the ones shown to dashboard operators.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ID de estación requerido y debe ser mayor a 0")]
    InvalidStationId,
    #[error("Tipo de sensor requerido")]
    MissingSensorType,
    #[error("Al menos un umbral es requerido")]
    NoThresholds,
    #[error("No se pueden duplicar niveles de umbral")]
    DuplicateLevel(ThresholdLevel),
    #[error("Valor mínimo debe ser menor al máximo para el nivel {0}")]
    InvertedBounds(ThresholdLevel),
    #[error("Tiempo de persistencia debe ser mayor o igual a 0")]
    NegativePersistence(ThresholdLevel),
    #[error("Tolerancia debe ser mayor o igual a 0")]
    NegativeTolerance(ThresholdLevel),
    #[error("Los valores del umbral {0} deben ser números finitos")]
    NonFiniteValue(ThresholdLevel),
    #[error("Ya existe una configuración para el sensor {sensor_type} en esta estación")]
    AlreadyConfigured { station_id: u64, sensor_type: String },
    #[error("ID de configuración inválido")]
    InvalidConfigurationId,
    #[error("Configuración de alerta no encontrada")]
    NotFound(u64),
    #[error("duplicate configuration id {0} in config file")]
    DuplicateConfigurationId(u64),
    #[error("duplicate threshold id {0} in config file")]
    DuplicateThresholdId(u64),
    #[error("history_limit must be greater than 0")]
    InvalidHistoryLimit,
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
