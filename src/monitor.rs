//! Polling monitor.
//!
//! A [`SensorMonitor`] watches one (station, sensor type) stream. Each poll
//! merges new readings into its bounded history, evaluates the stream against
//! the registry's configuration, passes breaches through the stream's own
//! [`EmissionGate`] and dispatches whatever gets through.
//!
//! [`MonitorSet`] holds one monitor per stream and drives a whole feed
//! snapshot at once.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::alert::emission::{EmissionContext, EmissionGate};
use crate::alert::stalenesses::is_stale_at;
use crate::alert::thresholds::evaluate;
use crate::analysis::groupings::{StreamKey, group_by_stream};
use crate::analysis::trend::{Trend, trend};
use crate::config::MonitorSettings;
use crate::ingest::measurements::Measurement;
use crate::logging::{self, LogSource};
use crate::model::{EvaluationResult, Reading, StatusLevel};
use crate::notify::{NotificationSink, breach_notification};
use crate::stations::AlertRegistry;

/// What one poll of one stream produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub station_id: u64,
    pub sensor_type: String,
    pub result: EvaluationResult,
    pub latest: Option<Reading>,
    pub trend: Trend,
    /// Latest reading is older than the staleness limit.
    pub stale: bool,
    /// A notification was dispatched for this poll.
    pub emitted: bool,
    pub signature: Option<String>,
}

// ---------------------------------------------------------------------------
// Single stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SensorMonitor {
    station_id: u64,
    sensor_type: String,
    history: Vec<Reading>,
    history_limit: usize,
    stale_after_minutes: u64,
    gate: EmissionGate,
    /// Configuration the gate's memory was built against.
    configuration_id: Option<u64>,
}

impl SensorMonitor {
    pub fn new(
        station_id: u64,
        sensor_type: impl Into<String>,
        history_limit: usize,
        stale_after_minutes: u64,
    ) -> Self {
        Self {
            station_id,
            sensor_type: sensor_type.into(),
            history: Vec::new(),
            history_limit,
            stale_after_minutes,
            gate: EmissionGate::new(),
            configuration_id: None,
        }
    }

    pub fn station_id(&self) -> u64 {
        self.station_id
    }

    pub fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    /// Chronological history, oldest first.
    pub fn history(&self) -> &[Reading] {
        &self.history
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.history.last()
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.gate.last_signature()
    }

    /// Merges `readings` into the history. Readings whose timestamp is
    /// already present are ignored; the oldest readings are dropped once the
    /// history exceeds its limit.
    pub fn ingest(&mut self, readings: impl IntoIterator<Item = Reading>) {
        for reading in readings {
            if self.history.iter().any(|r| r.timestamp == reading.timestamp) {
                continue;
            }
            self.history.push(reading);
        }
        self.history.sort_by_key(|r| r.timestamp);

        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(..excess);
        }
    }

    /// Runs one ingest → evaluate → gate → dispatch pass.
    pub fn poll(
        &mut self,
        registry: &AlertRegistry,
        new_readings: impl IntoIterator<Item = Reading>,
        now: DateTime<Utc>,
        sink: &mut dyn NotificationSink,
    ) -> PollOutcome {
        self.ingest(new_readings);
        let tag = logging::stream_tag(self.station_id, &self.sensor_type);

        let configuration = registry.find_by_sensor(self.station_id, &self.sensor_type);
        let configuration_id = configuration.map(|c| c.id);
        if configuration_id != self.configuration_id {
            if self.configuration_id.is_some() {
                logging::debug(LogSource::Gate, Some(&tag), "Configuration changed, gate reset");
            }
            self.gate.reset();
            self.configuration_id = configuration_id;
        }

        let latest = self.history.last().cloned();
        let result = evaluate(
            configuration,
            latest.as_ref().map(|r| r.value),
            &self.history,
            now,
        );

        let context = EmissionContext {
            station_id: self.station_id,
            sensor_type: self.sensor_type.clone(),
            latest_reading_timestamp: latest.as_ref().map(|r| r.timestamp),
        };
        let decision = self.gate.should_emit(&result, &context);

        let mut emitted = false;
        if decision.emit {
            let notification = configuration
                .zip(latest.as_ref())
                .and_then(|(config, reading)| breach_notification(&result, config, reading.value));
            if let Some(notification) = notification {
                logging::warn(
                    LogSource::Evaluator,
                    Some(&tag),
                    &format!("{} ({})", result.message, notification.body),
                );
                sink.dispatch(notification);
                emitted = true;
            }
        } else {
            logging::debug(
                LogSource::Evaluator,
                Some(&tag),
                &format!("{}: {}", result.level, result.message),
            );
        }

        let stale = latest
            .as_ref()
            .is_some_and(|r| is_stale_at(r, self.stale_after_minutes, now));
        if stale {
            logging::warn(
                LogSource::Feed,
                Some(&tag),
                &format!("No reading in the last {} minutes", self.stale_after_minutes),
            );
        }

        PollOutcome {
            station_id: self.station_id,
            sensor_type: self.sensor_type.clone(),
            result,
            latest,
            trend: trend(&self.history),
            stale,
            emitted,
            signature: decision.signature,
        }
    }
}

// ---------------------------------------------------------------------------
// All streams
// ---------------------------------------------------------------------------

/// One [`SensorMonitor`] per stream, created on first sight.
#[derive(Debug, Clone)]
pub struct MonitorSet {
    monitors: BTreeMap<StreamKey, SensorMonitor>,
    history_limit: usize,
    stale_after_minutes: u64,
}

impl MonitorSet {
    pub fn new(settings: &MonitorSettings) -> Self {
        Self {
            monitors: BTreeMap::new(),
            history_limit: settings.history_limit,
            stale_after_minutes: settings.stale_after_minutes,
        }
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn get(&self, station_id: u64, sensor_type: &str) -> Option<&SensorMonitor> {
        self.monitors.get(&StreamKey::new(station_id, sensor_type))
    }

    /// Polls every configured stream and every stream present in
    /// `measurements`, in (station id, sensor type) order.
    ///
    /// Configured streams without measurements are still polled, so they
    /// report `Sin datos` rather than disappearing.
    pub fn poll_all(
        &mut self,
        registry: &AlertRegistry,
        measurements: &[Measurement],
        now: DateTime<Utc>,
        sink: &mut dyn NotificationSink,
    ) -> Vec<PollOutcome> {
        let mut groups = group_by_stream(measurements, self.history_limit);
        for configuration in registry.all() {
            groups
                .entry(StreamKey::new(configuration.station_id, configuration.sensor_type.as_str()))
                .or_default();
        }

        let mut outcomes = Vec::with_capacity(groups.len());
        for (key, readings) in groups {
            let (history_limit, stale_after) = (self.history_limit, self.stale_after_minutes);
            let monitor = self.monitors.entry(key.clone()).or_insert_with(|| {
                SensorMonitor::new(key.station_id, key.sensor_type.as_str(), history_limit, stale_after)
            });
            outcomes.push(monitor.poll(registry, readings, now, sink));
        }

        let breaching = outcomes.iter().filter(|o| o.result.level.is_breach()).count();
        let unknown = outcomes
            .iter()
            .filter(|o| o.result.level == StatusLevel::Unknown)
            .count();
        logging::log_poll_summary(outcomes.len(), breaching, unknown);

        outcomes
    }
}

fn severity(level: StatusLevel) -> u8 {
    match level {
        StatusLevel::Unknown => 0,
        StatusLevel::Normal => 1,
        StatusLevel::Warning => 2,
        StatusLevel::Critical => 3,
        StatusLevel::Emergency => 4,
    }
}

/// Worst status per station across `outcomes`, ordered by station id.
pub fn station_statuses(outcomes: &[PollOutcome]) -> BTreeMap<u64, StatusLevel> {
    let mut statuses: BTreeMap<u64, StatusLevel> = BTreeMap::new();
    for outcome in outcomes {
        let level = outcome.result.level;
        statuses
            .entry(outcome.station_id)
            .and_modify(|worst| {
                if severity(level) > severity(*worst) {
                    *worst = level;
                }
            })
            .or_insert(level);
    }
    statuses
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
