//! Notification dispatch.
//!
//! The evaluator decides *whether* a breach is worth reporting; this module
//! decides *what* is reported and hands it to a [`NotificationSink`]. How a
//! sink delivers it (toast, sound, push, log line) is the sink's business.

use std::fmt;

use crate::alert::thresholds::describe_bounds;
use crate::logging::{self, LogSource};
use crate::model::{AlertConfiguration, EvaluationResult, StatusLevel, ThresholdLevel};

// ---------------------------------------------------------------------------
// Notification types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl NotificationLevel {
    /// Operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            NotificationLevel::Info => "Información",
            NotificationLevel::Warning => "Advertencia",
            NotificationLevel::Critical => "Crítico",
            NotificationLevel::Emergency => "Emergencia",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<ThresholdLevel> for NotificationLevel {
    fn from(level: ThresholdLevel) -> Self {
        match level {
            ThresholdLevel::Warning => NotificationLevel::Warning,
            ThresholdLevel::Critical => NotificationLevel::Critical,
            ThresholdLevel::Emergency => NotificationLevel::Emergency,
        }
    }
}

/// A message for the notification collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    /// Stays on screen until dismissed. Set for critical and emergency.
    pub persistent: bool,
    /// Number of stations involved, for station-wide summaries.
    pub station_count: Option<usize>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
            persistent: level >= NotificationLevel::Critical,
            station_count: None,
        }
    }

    pub fn with_station_count(mut self, count: usize) -> Self {
        self.station_count = Some(count);
        self
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives notifications for delivery.
pub trait NotificationSink {
    fn dispatch(&mut self, notification: Notification);
}

/// Keeps dispatched notifications in memory, newest last.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    notifications: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Removes notifications at `level`, or all of them when `None`.
    pub fn clear(&mut self, level: Option<NotificationLevel>) {
        match level {
            Some(level) => self.notifications.retain(|n| n.level != level),
            None => self.notifications.clear(),
        }
    }

    pub fn critical_count(&self) -> usize {
        self.count(NotificationLevel::Critical)
    }

    pub fn emergency_count(&self) -> usize {
        self.count(NotificationLevel::Emergency)
    }

    pub fn has_active(&self) -> bool {
        !self.notifications.is_empty()
    }

    fn count(&self, level: NotificationLevel) -> usize {
        self.notifications.iter().filter(|n| n.level == level).count()
    }
}

impl NotificationSink for NotificationLog {
    fn dispatch(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// Writes notifications to the service log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&mut self, notification: Notification) {
        let line = format!("[{}] {}: {}", notification.level, notification.title, notification.body);
        match notification.level {
            NotificationLevel::Info => logging::info(LogSource::Gate, None, &line),
            NotificationLevel::Warning => logging::warn(LogSource::Gate, None, &line),
            NotificationLevel::Critical | NotificationLevel::Emergency => {
                logging::error(LogSource::Gate, None, &line)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

/// Builds the notification for a breach result. Returns `None` for
/// non-breach results.
pub fn breach_notification(
    result: &EvaluationResult,
    configuration: &AlertConfiguration,
    value: f64,
) -> Option<Notification> {
    let threshold = result.matched_threshold.as_ref()?;
    if !result.level.is_breach() {
        return None;
    }

    let level = NotificationLevel::from(threshold.level);
    let title = format!(
        "{} - {} ({})",
        level.label(),
        configuration.sensor_type,
        configuration.station_label()
    );
    let body = format!(
        "Valor actual {:.2} {} fuera del umbral {} ({}).",
        value,
        configuration.sensor_unit,
        threshold.level,
        describe_bounds(threshold, &configuration.sensor_unit)
    );
    Some(Notification::new(level, title, body))
}

/// Station-wide escalation over the worst status of each station.
///
/// Three or more stations in critical (or worse) raise an emergency; one or
/// two raise a critical alert; warnings alone raise a warning. Returns `None`
/// when no station is breaching.
pub fn station_summary(station_statuses: &[StatusLevel]) -> Option<Notification> {
    let critical = station_statuses
        .iter()
        .filter(|s| matches!(s, StatusLevel::Critical | StatusLevel::Emergency))
        .count();
    let warning = station_statuses
        .iter()
        .filter(|s| matches!(s, StatusLevel::Warning))
        .count();

    if critical >= 3 {
        return Some(
            Notification::new(
                NotificationLevel::Emergency,
                "EMERGENCIA DEL SISTEMA",
                format!(
                    "{critical} estaciones en estado crítico. Activar protocolo de emergencia inmediatamente."
                ),
            )
            .with_station_count(critical),
        );
    }

    if critical > 0 {
        let verb = if critical == 1 {
            "estación presenta"
        } else {
            "estaciones presentan"
        };
        return Some(
            Notification::new(
                NotificationLevel::Critical,
                "ALERTA CRÍTICA",
                format!("{critical} {verb} niveles críticos."),
            )
            .with_station_count(critical),
        );
    }

    if warning > 0 {
        let verb = if warning == 1 {
            "estación requiere"
        } else {
            "estaciones requieren"
        };
        return Some(
            Notification::new(
                NotificationLevel::Warning,
                "Alerta de Monitoreo",
                format!("{warning} {verb} atención."),
            )
            .with_station_count(warning),
        );
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
