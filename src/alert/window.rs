//! Persistence window selection.
//!
//! A threshold with a persistence time only fires when every reading inside
//! the trailing window breaches it. This module picks that window out of the
//! caller's recent-history buffer.
//!
//! Like the staleness check, `now` is always passed in so the window is
//! deterministic in tests.

use chrono::{DateTime, Duration, Utc};

use crate::model::Reading;

/// Start of a trailing window of `persistence_minutes` ending at `now`.
///
/// Fractional minutes are honoured down to the millisecond. A window reaching
/// past the representable range starts at [`DateTime::<Utc>::MIN_UTC`], so
/// every reading falls inside it.
pub fn window_start(persistence_minutes: f64, now: DateTime<Utc>) -> DateTime<Utc> {
    let millis = (persistence_minutes * 60_000.0).round();
    if millis <= 0.0 {
        return now;
    }
    if !(millis < i64::MAX as f64) {
        return DateTime::<Utc>::MIN_UTC;
    }
    Duration::try_milliseconds(millis as i64)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns the readings whose timestamp is at or after
/// `now - persistence_minutes`.
///
/// Input order is preserved; readings are expected chronologically. An empty
/// result is not an error: the resolver reads it as "not enough data to
/// confirm a sustained breach".
pub fn window_readings(
    readings: &[Reading],
    persistence_minutes: f64,
    now: DateTime<Utc>,
) -> Vec<&Reading> {
    let start = window_start(persistence_minutes, now);
    readings.iter().filter(|r| r.timestamp >= start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn minutes_ago(minutes: i64, value: f64) -> Reading {
        Reading::new(value, fixed_now() - Duration::minutes(minutes))
    }

    #[test]
    fn test_keeps_only_readings_inside_window() {
        let readings = vec![minutes_ago(20, 1.0), minutes_ago(10, 2.0), minutes_ago(0, 3.0)];
        let window = window_readings(&readings, 15.0, fixed_now());
        let values: Vec<f64> = window.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2.0, 3.0], "20-minute-old reading is outside a 15-min window");
    }

    #[test]
    fn test_reading_exactly_at_window_start_is_included() {
        let readings = vec![minutes_ago(15, 1.0)];
        let window = window_readings(&readings, 15.0, fixed_now());
        assert_eq!(window.len(), 1, "window start is inclusive (>=)");
    }

    #[test]
    fn test_order_is_preserved() {
        // Deliberately out of order; the filter must not re-sort.
        let readings = vec![minutes_ago(1, 9.0), minutes_ago(5, 5.0), minutes_ago(3, 7.0)];
        let window = window_readings(&readings, 10.0, fixed_now());
        let values: Vec<f64> = window.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![9.0, 5.0, 7.0]);
    }

    #[test]
    fn test_huge_persistence_clamps_to_earliest_time() {
        for minutes in [f64::INFINITY, 1e12, 1e300] {
            assert_eq!(
                window_start(minutes, fixed_now()),
                DateTime::<Utc>::MIN_UTC,
                "{minutes} minutes reaches past the earliest representable time"
            );
        }
        let readings = vec![minutes_ago(60 * 24 * 365, 1.0), minutes_ago(0, 2.0)];
        assert_eq!(window_readings(&readings, f64::INFINITY, fixed_now()).len(), 2);
    }

    #[test]
    fn test_empty_input_yields_empty_window() {
        assert!(window_readings(&[], 10.0, fixed_now()).is_empty());
    }

    #[test]
    fn test_all_readings_too_old_yields_empty_window() {
        let readings = vec![minutes_ago(60, 1.0), minutes_ago(45, 1.0)];
        assert!(window_readings(&readings, 10.0, fixed_now()).is_empty());
    }

    #[test]
    fn test_fractional_minutes() {
        assert_eq!(
            window_start(0.5, fixed_now()),
            fixed_now() - Duration::seconds(30)
        );
    }
}
