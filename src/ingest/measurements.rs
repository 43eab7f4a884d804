//! Measurement feed payloads.
//!
//! The dashboard API serves measurements from two endpoints with slightly
//! different shapes: the "latest" endpoint returns a bare JSON array, the
//! historical endpoint a paginated `{"results": [...]}` object. Either may
//! send `value` as a number or as a decimal string, and the station as
//! `station` or `station_id`. This module accepts both and normalises them
//! into [`Measurement`]s, then cuts per-stream [`Reading`] histories out of
//! them for the evaluator.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Quality, Reading};

/// Readings the sensor preview keeps per stream.
pub const DEFAULT_READING_LIMIT: usize = 24;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to parse measurement payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid timestamp '{value}' in measurement {id}: {source}")]
    InvalidTimestamp {
        id: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("measurement {0} has no station")]
    MissingStation(u64),
    #[error("measurement {0} has no variable type")]
    MissingVariableType(u64),
}

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<ApiMeasurement>),
    Page { results: Vec<ApiMeasurement> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// Numeric value, `None` if the text is not a number.
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One measurement as sent by the API.
#[derive(Debug, Deserialize)]
struct ApiMeasurement {
    id: u64,
    #[serde(default)]
    station: Option<u64>,
    #[serde(default)]
    station_id: Option<u64>,
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    variable_type: Option<String>,
    #[serde(default)]
    measurement_type: Option<String>,
    value: NumberOrText,
    #[serde(default)]
    unit: String,
    timestamp: String,
    #[serde(default)]
    is_critical: bool,
    #[serde(default)]
    quality: Option<Quality>,
}

/// A normalised measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub id: u64,
    pub station_id: u64,
    pub station_name: Option<String>,
    pub variable_type: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub is_critical: bool,
    pub quality: Option<Quality>,
}

impl Measurement {
    pub fn to_reading(&self) -> Reading {
        Reading {
            value: self.value,
            timestamp: self.timestamp,
            quality: self.quality,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a measurement payload (bare array or paginated object).
///
/// Measurements whose value is not a finite number are dropped: the
/// evaluator assumes finite inputs. A missing station or variable type, or
/// an unparseable timestamp, fails the whole payload.
pub fn parse_measurements(json: &str) -> Result<Vec<Measurement>, FeedError> {
    let raw = match serde_json::from_str::<Payload>(json)? {
        Payload::List(items) => items,
        Payload::Page { results } => results,
    };

    let mut measurements = Vec::with_capacity(raw.len());
    for item in raw {
        if let Some(measurement) = normalise(item)? {
            measurements.push(measurement);
        }
    }
    Ok(measurements)
}

fn normalise(item: ApiMeasurement) -> Result<Option<Measurement>, FeedError> {
    let station_id = item
        .station
        .or(item.station_id)
        .ok_or(FeedError::MissingStation(item.id))?;
    let variable_type = item
        .variable_type
        .or(item.measurement_type)
        .ok_or(FeedError::MissingVariableType(item.id))?;

    let Some(value) = item.value.as_f64().filter(|v| v.is_finite()) else {
        return Ok(None);
    };

    let timestamp = DateTime::parse_from_rfc3339(&item.timestamp)
        .map_err(|source| FeedError::InvalidTimestamp {
            id: item.id,
            value: item.timestamp.clone(),
            source,
        })?
        .with_timezone(&Utc);

    Ok(Some(Measurement {
        id: item.id,
        station_id,
        station_name: item.station_name,
        variable_type,
        value,
        unit: item.unit,
        timestamp,
        is_critical: item.is_critical,
        quality: item.quality,
    }))
}

// ============================================================================
// Stream Selection
// ============================================================================

/// The `limit` most recent readings of one (station, sensor type) stream, in
/// chronological order (oldest first).
pub fn latest_readings(
    measurements: &[Measurement],
    station_id: u64,
    sensor_type: &str,
    limit: usize,
) -> Vec<Reading> {
    let selected: Vec<&Measurement> = measurements
        .iter()
        .filter(|m| m.station_id == station_id && m.variable_type == sensor_type)
        .collect();
    most_recent(selected, limit)
}

/// The `limit` most recent of `selected` as readings, oldest first.
pub fn most_recent(mut selected: Vec<&Measurement>, limit: usize) -> Vec<Reading> {
    // Newest first, keep `limit`, then flip back to oldest first.
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    selected.truncate(limit);
    selected.reverse();

    selected.into_iter().map(Measurement::to_reading).collect()
}

// ============================================================================
// Tests
// ============================================================================
