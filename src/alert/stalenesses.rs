//! Reading staleness detection.
//!
//! Stations report on a fixed interval. During a high-water event a silent
//! sensor is dangerous: the last value keeps showing on the status badge even
//! though nothing new has arrived. The monitor uses this check to flag those
//! streams in the log; it never changes the evaluated status.
//!
//! # Clock injection
//! `is_stale_at` takes `now` rather than calling `Utc::now()`, so staleness is
//! deterministic in tests.

use chrono::{DateTime, Duration, Utc};

use crate::model::Reading;

/// Default age, in minutes, after which a reading is no longer recent.
pub const DEFAULT_STALE_AFTER_MINUTES: u64 = 30;

/// Returns `true` if `reading` is older than `max_age_minutes` relative to
/// `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// Readings timestamped in the future (clock skew) are not stale.
pub fn is_stale_at(reading: &Reading, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(reading.timestamp);
    match i64::try_from(max_age_minutes).ok().and_then(Duration::try_minutes) {
        Some(limit) => age > limit,
        // Limit longer than any representable age.
        None => false,
    }
}

/// Convenience wrapper that uses the real current time.
/// Use `is_stale_at` in tests to keep them deterministic.
pub fn is_stale(reading: &Reading, max_age_minutes: u64) -> bool {
    is_stale_at(reading, max_age_minutes, Utc::now())
}
