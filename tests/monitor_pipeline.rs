/// Integration tests for the config → feed → monitor pipeline
///
/// Tests verify:
/// 1. A TOML config file and a JSON measurement payload drive a full poll
/// 2. Notifications are dispatched once per breach instant across polls
/// 3. Station-wide summaries escalate with the number of critical stations
/// 4. Verification reports flag configurations that cannot alert
///
/// Run with: cargo test --test monitor_pipeline

use chrono::{DateTime, Duration, TimeZone, Utc};
use rioclaro_monitor::config::{load_config, parse_config, read_configurations};
use rioclaro_monitor::ingest::measurements::parse_measurements;
use rioclaro_monitor::model::StatusLevel;
use rioclaro_monitor::monitor::{MonitorSet, station_statuses};
use rioclaro_monitor::notify::{NotificationLevel, NotificationLog, station_summary};
use rioclaro_monitor::verify::{VerificationStatus, verify_configurations};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"
[monitor]
history_limit = 24
stale_after_minutes = 30

[[configuration]]
station_id = 1
station_name = "Río Claro - Puente Norte"
sensor_type = "water_level"
sensor_unit = "m"

[[configuration.threshold]]
id = 11
level = "warning"
max_value = 2.5

[[configuration.threshold]]
id = 12
level = "critical"
max_value = 3.0
persistence_time = 10

[[configuration]]
station_id = 2
station_name = "Río Claro - Desembocadura"
sensor_type = "ph"
sensor_unit = "pH"

[[configuration.threshold]]
id = 21
level = "warning"
min_value = 6.5
max_value = 8.5
tolerance = 0.1
"#;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

fn payload(entries: &[(u64, u64, &str, f64, i64)]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|(id, station, sensor, value, minutes_ago)| {
            let ts = fixed_now() - Duration::minutes(*minutes_ago);
            format!(
                r#"{{"id": {id}, "station_id": {station}, "variable_type": "{sensor}", "value": {value}, "unit": "", "timestamp": "{}"}}"#,
                ts.to_rfc3339()
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_full_poll_from_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rioclaro.toml");
    std::fs::write(&path, CONFIG).expect("write config");
    let config = load_config(&path).expect("config loads");

    let measurements = parse_measurements(&payload(&[
        (1, 1, "water_level", 2.8, 8),
        (2, 1, "water_level", 2.9, 4),
        (3, 1, "water_level", 3.2, 0),
        (4, 2, "ph", 7.2, 0),
    ]))
    .expect("payload parses");

    let mut set = MonitorSet::new(&config.settings);
    let mut log = NotificationLog::new();
    let outcomes = set.poll_all(&config.registry, &measurements, fixed_now(), &mut log);

    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        outcomes[0].result.level,
        StatusLevel::Warning,
        "critical is not sustained over 10 minutes, warning applies"
    );
    assert_eq!(outcomes[1].result.level, StatusLevel::Normal);
    assert_eq!(log.len(), 1);
    assert_eq!(log.notifications()[0].level, NotificationLevel::Warning);
    assert_eq!(
        log.notifications()[0].title,
        "Advertencia - water_level (Río Claro - Puente Norte)"
    );
}

#[test]
fn test_repeated_polls_do_not_renotify() {
    let config = parse_config(CONFIG).expect("config parses");
    let measurements = parse_measurements(&payload(&[(1, 2, "ph", 9.1, 0)])).expect("payload parses");

    let mut set = MonitorSet::new(&config.settings);
    let mut log = NotificationLog::new();
    for poll in 0..4 {
        let now = fixed_now() + Duration::seconds(30 * poll);
        let outcomes = set.poll_all(&config.registry, &measurements, now, &mut log);
        assert_eq!(outcomes[1].result.level, StatusLevel::Warning);
    }

    assert_eq!(log.len(), 1, "one notification for one breach instant");
}

#[test]
fn test_sustained_breach_escalates_to_critical() {
    let config = parse_config(CONFIG).expect("config parses");
    let mut set = MonitorSet::new(&config.settings);
    let mut log = NotificationLog::new();

    let first = parse_measurements(&payload(&[(1, 1, "water_level", 3.1, 12), (2, 1, "water_level", 3.3, 6)]))
        .expect("payload parses");
    let outcomes = set.poll_all(&config.registry, &first, fixed_now() - Duration::minutes(6), &mut log);
    assert_eq!(outcomes[0].result.level, StatusLevel::Critical);

    let second = parse_measurements(&payload(&[(3, 1, "water_level", 3.4, 0)])).expect("payload parses");
    let outcomes = set.poll_all(&config.registry, &second, fixed_now(), &mut log);
    assert_eq!(outcomes[0].result.level, StatusLevel::Critical);
    assert_eq!(outcomes[0].trend.as_str(), "rising");
    assert_eq!(log.critical_count(), 2, "each new breaching reading is notified");
}

#[test]
fn test_station_summary_over_poll() {
    let config = parse_config(CONFIG).expect("config parses");
    let measurements = parse_measurements(&payload(&[
        (1, 1, "water_level", 2.6, 0),
        (2, 2, "ph", 5.0, 0),
    ]))
    .expect("payload parses");

    let mut set = MonitorSet::new(&config.settings);
    let mut log = NotificationLog::new();
    let outcomes = set.poll_all(&config.registry, &measurements, fixed_now(), &mut log);

    let statuses: Vec<StatusLevel> = station_statuses(&outcomes).into_values().collect();
    let summary = station_summary(&statuses).expect("two stations in warning");
    assert_eq!(summary.level, NotificationLevel::Warning);
    assert_eq!(summary.station_count, Some(2));
}

#[test]
fn test_verification_of_raw_config_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rioclaro.toml");
    let text = format!(
        "{CONFIG}\n{}",
        r#"
[[configuration]]
station_id = 3
sensor_type = "rainfall"
sensor_unit = "mm"

[[configuration.threshold]]
level = "warning"
min_value = 50.0
max_value = 10.0
"#
    );
    std::fs::write(&path, text).expect("write config");

    assert!(load_config(&path).is_err(), "inverted bounds are rejected on load");

    let configurations = read_configurations(&path).expect("raw read");
    let report = verify_configurations(&configurations, fixed_now());
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.working, 2);
    assert_eq!(report.results[2].status, VerificationStatus::Failed);
}
