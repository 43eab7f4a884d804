//! Alert emission gate.
//!
//! The monitor re-evaluates every stream on a polling timer, so the same
//! breach is seen many times. The gate remembers the signature of the last
//! breach it let through and reports each unique breach instant once.
//!
//! One gate belongs to exactly one (station, sensor) stream. Callers that
//! watch several sensors keep one gate per stream; no state is shared.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::model::{EvaluationResult, StatusLevel};

/// Identifies the stream and reading an evaluation was made for.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionContext {
    pub station_id: u64,
    pub sensor_type: String,
    /// Timestamp of the latest reading fed to the evaluator.
    pub latest_reading_timestamp: Option<DateTime<Utc>>,
}

/// Deduplication key for one breach instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertSignature {
    pub station_id: u64,
    pub sensor_type: String,
    pub threshold_id: Option<u64>,
    pub level: StatusLevel,
    pub reading_timestamp: Option<DateTime<Utc>>,
}

impl AlertSignature {
    pub fn new(result: &EvaluationResult, context: &EmissionContext) -> Self {
        Self {
            station_id: context.station_id,
            sensor_type: context.sensor_type.clone(),
            threshold_id: result.matched_threshold.as_ref().map(|t| t.id),
            level: result.level,
            reading_timestamp: context.latest_reading_timestamp,
        }
    }
}

/// Renders as `station:sensor:threshold:level:timestamp`, with `-` for
/// missing parts.
impl fmt::Display for AlertSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.station_id, self.sensor_type)?;
        match self.threshold_id {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("-")?,
        }
        write!(f, ":{}:", self.level)?;
        match self.reading_timestamp {
            Some(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => f.write_str("-"),
        }
    }
}

/// Outcome of [`EmissionGate::should_emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionDecision {
    pub emit: bool,
    /// Signature of the breach, `None` for non-breach results.
    pub signature: Option<String>,
}

/// One-slot memory of the last emitted breach signature.
#[derive(Debug, Clone, Default)]
pub struct EmissionGate {
    last_signature: Option<String>,
}

impl EmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    /// Decides whether `result` should be notified.
    ///
    /// - non-breach results clear the stored signature and never emit;
    /// - a breach whose signature equals the stored one does not emit;
    /// - any other breach replaces the stored signature and emits.
    pub fn should_emit(
        &mut self,
        result: &EvaluationResult,
        context: &EmissionContext,
    ) -> EmissionDecision {
        if !result.level.is_breach() {
            self.last_signature = None;
            return EmissionDecision {
                emit: false,
                signature: None,
            };
        }

        let signature = AlertSignature::new(result, context).to_string();
        if self.last_signature.as_deref() == Some(signature.as_str()) {
            return EmissionDecision {
                emit: false,
                signature: Some(signature),
            };
        }

        self.last_signature = Some(signature.clone());
        EmissionDecision {
            emit: true,
            signature: Some(signature),
        }
    }

    /// Forgets the stored signature, e.g. when the stream's configuration
    /// is replaced.
    pub fn reset(&mut self) {
        self.last_signature = None;
    }
}
