//! Structured logging for the alert monitor.
//!
//! Provides context-rich logging tagged with the subsystem that produced the
//! event and, where there is one, the station stream it concerns. Events go
//! through `tracing`; `init_logger` installs a console subscriber and an
//! optional append-only log file for daemon operation.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Log Sources
// ---------------------------------------------------------------------------

/// Subsystem an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Evaluator,
    Gate,
    Registry,
    Feed,
    Config,
    System,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Evaluator => write!(f, "EVAL"),
            LogSource::Gate => write!(f, "GATE"),
            LogSource::Registry => write!(f, "REG"),
            LogSource::Feed => write!(f, "FEED"),
            LogSource::Config => write!(f, "CFG"),
            LogSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - operator input rejected by validation, empty feed
    Expected,
    /// Unexpected failure - unreadable files or malformed payloads
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber Setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `min_level` when set. Console output goes to stderr,
/// with or without timestamps. When `log_file` is given, events are also
/// appended to it without ANSI colouring; a file that cannot be opened is
/// reported on stderr and skipped.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_directive()));

    let console_timed = console_timestamps.then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let console_plain = (!console_timestamps).then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
    });

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_timed)
        .with(console_plain)
        .with(file_layer)
        .try_init()
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

fn log(level: LogLevel, source: LogSource, station: Option<&str>, message: &str) {
    let station = station.unwrap_or("-");
    match level {
        LogLevel::Debug => tracing::debug!(source = %source, station, "{}", message),
        LogLevel::Info => tracing::info!(source = %source, station, "{}", message),
        LogLevel::Warning => tracing::warn!(source = %source, station, "{}", message),
        LogLevel::Error => tracing::error!(source = %source, station, "{}", message),
    }
}

/// Log a general informational message
pub fn info(source: LogSource, station: Option<&str>, message: &str) {
    log(LogLevel::Info, source, station, message);
}

/// Log a warning message
pub fn warn(source: LogSource, station: Option<&str>, message: &str) {
    log(LogLevel::Warning, source, station, message);
}

/// Log an error message
pub fn error(source: LogSource, station: Option<&str>, message: &str) {
    log(LogLevel::Error, source, station, message);
}

/// Log a debug message
pub fn debug(source: LogSource, station: Option<&str>, message: &str) {
    log(LogLevel::Debug, source, station, message);
}

/// Stream tag used in log lines: `<station_id>/<sensor_type>`.
pub fn stream_tag(station_id: u64, sensor_type: &str) -> String {
    format!("{}/{}", station_id, sensor_type)
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Fragments of the configuration registry's validation messages.
const VALIDATION_MARKERS: &[&str] = &[
    "umbral",
    "Tipo de sensor",
    "ID de",
    "Valor mínimo",
    "persistencia",
    "Tolerancia",
    "Ya existe",
    "no encontrada",
];

/// Classify a failure from its error message.
pub fn classify_failure(error_message: &str) -> FailureType {
    if error_message.starts_with("failed to read") || error_message.starts_with("failed to parse") {
        FailureType::Unexpected
    } else if error_message.contains("invalid timestamp") {
        // Station clocks occasionally emit garbage; worth a look but not fatal
        FailureType::Unknown
    } else if VALIDATION_MARKERS.iter().any(|m| error_message.contains(m)) {
        FailureType::Expected
    } else {
        FailureType::Unknown
    }
}

/// Log a failure with automatic classification
pub fn log_failure(
    source: LogSource,
    station: Option<&str>,
    operation: &str,
    err: &dyn std::error::Error,
) {
    let error_msg = err.to_string();
    let failure_type = classify_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(source, station, &message),
        FailureType::Unexpected => error(source, station, &message),
        FailureType::Unknown => warn(source, station, &message),
    }
}

// ---------------------------------------------------------------------------
// Poll Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one polling pass over all streams
pub fn log_poll_summary(total: usize, breaching: usize, unknown: usize) {
    let message = format!(
        "Poll complete: {} streams, {} breaching, {} without status",
        total, breaching, unknown
    );

    if breaching > 0 {
        warn(LogSource::Evaluator, None, &message);
    } else if total > 0 && unknown == total {
        error(LogSource::Evaluator, None, &message);
    } else {
        info(LogSource::Evaluator, None, &message);
    }
}
