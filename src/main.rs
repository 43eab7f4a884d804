//! `rioclaro-monitor`: one evaluation pass over a measurement snapshot.
//!
//! ```text
//! rioclaro-monitor [config.toml] <measurements.json>
//! rioclaro-monitor --verify [config.toml]
//! ```

use chrono::Utc;
use std::error::Error;
use std::path::Path;

use rioclaro_monitor::config::{self, MonitorConfig};
use rioclaro_monitor::ingest::measurements::parse_measurements;
use rioclaro_monitor::logging::{self, LogSource};
use rioclaro_monitor::monitor::{MonitorSet, PollOutcome, station_statuses};
use rioclaro_monitor::notify::{LogSink, NotificationSink, station_summary};
use rioclaro_monitor::verify;

const USAGE: &str = "usage: rioclaro-monitor [config.toml] <measurements.json>\n       rioclaro-monitor --verify [config.toml]";

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, rest @ ..] if flag == "--verify" && rest.len() <= 1 => {
            run_verify(rest.first().map(String::as_str))
        }
        [measurements] => run_once(None, measurements),
        [config_path, measurements] => run_once(Some(config_path.as_str()), measurements),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn run_verify(explicit: Option<&str>) -> Result<(), Box<dyn Error>> {
    let path = config::resolve_config_path(explicit);
    let configurations = config::read_configurations(&path)?;
    let report = verify::verify_configurations(&configurations, Utc::now());
    verify::print_summary(&report);
    Ok(())
}

fn run_once(explicit: Option<&str>, measurements_path: &str) -> Result<(), Box<dyn Error>> {
    let path = config::resolve_config_path(explicit);
    let MonitorConfig { settings, registry } = config::load_config(&path)?;

    if let Err(e) = logging::init_logger(
        settings.log_level(),
        settings.log_file.as_deref(),
        settings.console_timestamps,
    ) {
        eprintln!("logger already initialised: {e}");
    }
    logging::info(
        LogSource::Config,
        None,
        &format!(
            "Loaded {} alert configurations from {}",
            registry.len(),
            path.display()
        ),
    );

    let payload = std::fs::read_to_string(Path::new(measurements_path))?;
    let measurements = match parse_measurements(&payload) {
        Ok(measurements) => measurements,
        Err(e) => {
            logging::log_failure(LogSource::Feed, None, "Measurement parse", &e);
            return Err(e.into());
        }
    };

    let now = Utc::now();
    let mut sink = LogSink;
    let mut monitors = MonitorSet::new(&settings);
    let outcomes = monitors.poll_all(&registry, &measurements, now, &mut sink);

    for outcome in &outcomes {
        println!("{}", status_line(outcome));
    }

    let statuses: Vec<_> = station_statuses(&outcomes).into_values().collect();
    if let Some(summary) = station_summary(&statuses) {
        println!("\n{}: {}", summary.title, summary.body);
        sink.dispatch(summary);
    }

    Ok(())
}

fn status_line(outcome: &PollOutcome) -> String {
    let tag = logging::stream_tag(outcome.station_id, &outcome.sensor_type);
    let latest = match &outcome.latest {
        Some(reading) => format!("{:.2} ({})", reading.value, outcome.trend.as_str()),
        None => "-".to_string(),
    };
    let stale = if outcome.stale { "  [stale]" } else { "" };
    format!(
        "{:<20} {:<9} {:<10} {}{}",
        tag,
        outcome.result.level.as_str(),
        latest,
        outcome.result.message,
        stale
    )
}
