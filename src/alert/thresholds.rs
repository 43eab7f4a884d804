//! Threshold breach evaluation.
//!
//! Decides, for a sensor's configured thresholds and its recent readings,
//! whether an alert condition is active and at which severity. Everything
//! here is a pure function of its inputs: no I/O, no clock reads, no errors.
//! Malformed thresholds (no bounds) are simply never breached.
//!
//! Notification dispatch and deduplication live in `alert::emission`.

use chrono::{DateTime, Utc};

use crate::alert::window::window_readings;
use crate::model::{AlertConfiguration, EvaluationResult, Reading, StatusLevel, Threshold};

pub const MSG_NO_CONFIGURATION: &str = "Sin configuración";
pub const MSG_NO_DATA: &str = "Sin datos";
pub const MSG_NORMAL: &str = "Valores normales";

// ---------------------------------------------------------------------------
// Breach predicate
// ---------------------------------------------------------------------------

/// Returns `true` if `value` lies outside the tolerance-padded bounds of
/// `threshold`.
///
/// | bounds       | breached when                                  |
/// |--------------|------------------------------------------------|
/// | min and max  | `value < min - tol` or `value > max + tol`     |
/// | min only     | `value < min - tol`                            |
/// | max only     | `value > max + tol`                            |
/// | neither      | never                                          |
///
/// Tolerance defaults to 0. The caller is responsible for excluding NaN.
pub fn is_breached(value: f64, threshold: &Threshold) -> bool {
    let tolerance = threshold.tolerance.unwrap_or(0.0);
    let below = threshold.min_value.is_some_and(|min| value < min - tolerance);
    let above = threshold.max_value.is_some_and(|max| value > max + tolerance);
    below || above
}

// ---------------------------------------------------------------------------
// Severity resolution
// ---------------------------------------------------------------------------

/// Checks whether `threshold` is confirmed breached: by `value` alone when it
/// has no persistence time, otherwise by every reading in its trailing window.
fn is_confirmed(value: f64, threshold: &Threshold, readings: &[Reading], now: DateTime<Utc>) -> bool {
    if !is_breached(value, threshold) {
        return false;
    }

    let Some(minutes) = threshold.persistence_minutes() else {
        return true;
    };

    let window = window_readings(readings, minutes, now);
    if window.is_empty() {
        // No evidence in the window: do not assume the breach persisted.
        return false;
    }
    window.iter().all(|r| is_breached(r.value, threshold))
}

/// Returns the highest-severity active threshold whose breach is confirmed,
/// or `None` if nothing is breached.
///
/// Thresholds are tried from emergency down to warning and the first
/// confirmed one wins. A higher-severity breach that is not yet sustained
/// does not hide a sustained lower-severity one: it is skipped and the loop
/// falls through to the next level.
pub fn resolve_breach<'a>(
    value: f64,
    thresholds: &'a [Threshold],
    readings: &[Reading],
    now: DateTime<Utc>,
) -> Option<&'a Threshold> {
    let mut active: Vec<&Threshold> = thresholds.iter().filter(|t| t.is_active).collect();
    // Stable sort keeps configuration order among equal levels.
    active.sort_by(|a, b| b.level.rank().cmp(&a.level.rank()));

    active
        .into_iter()
        .find(|t| is_confirmed(value, t, readings, now))
}

/// Evaluates the current status of one sensor stream.
///
/// `configuration` is the alert configuration for the stream, if any;
/// `current_value` is the latest reading's value, if any; `recent_readings`
/// is the caller's chronological history buffer used for persistence windows.
///
/// Every input combination maps to exactly one [`StatusLevel`]; this function
/// never fails.
pub fn evaluate(
    configuration: Option<&AlertConfiguration>,
    current_value: Option<f64>,
    recent_readings: &[Reading],
    now: DateTime<Utc>,
) -> EvaluationResult {
    let Some(configuration) = configuration else {
        return EvaluationResult {
            level: StatusLevel::Unknown,
            message: MSG_NO_CONFIGURATION.to_string(),
            matched_threshold: None,
        };
    };

    let Some(value) = current_value else {
        return EvaluationResult {
            level: StatusLevel::Unknown,
            message: MSG_NO_DATA.to_string(),
            matched_threshold: None,
        };
    };

    match resolve_breach(value, &configuration.thresholds, recent_readings, now) {
        Some(threshold) => EvaluationResult {
            level: threshold.level.into(),
            message: format!("Umbral {} activado", threshold.level),
            matched_threshold: Some(threshold.clone()),
        },
        None => EvaluationResult {
            level: StatusLevel::Normal,
            message: MSG_NORMAL.to_string(),
            matched_threshold: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Message formatting
// ---------------------------------------------------------------------------

/// Human description of a threshold's bounds, e.g. `"2.5 - 3 m"`,
/// `"≥ 6.5 pH"`, `"≤ 3 m"`, or `"Valor crítico"` when it has no bounds.
pub fn describe_bounds(threshold: &Threshold, unit: &str) -> String {
    let with_unit = |s: String| {
        if unit.is_empty() {
            s
        } else {
            format!("{s} {unit}")
        }
    };

    match (threshold.min_value, threshold.max_value) {
        (Some(min), Some(max)) => with_unit(format!("{min} - {max}")),
        (Some(min), None) => with_unit(format!("≥ {min}")),
        (None, Some(max)) => with_unit(format!("≤ {max}")),
        (None, None) => "Valor crítico".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
