//! Alert Configuration Verification Module
//!
//! Checks a set of alert configurations before they are put in front of the
//! monitor: which ones are valid and will alert, which are valid but cannot
//! alert in practice, and which would be rejected.
//!
//! Run this after editing the config file to see what the monitor will do
//! with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{AlertConfiguration, ConfigError, KNOWN_SENSOR_TYPES, ThresholdLevel};
use crate::stations::{AlertRegistry, validate_thresholds};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<ConfigurationVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationVerification {
    pub configuration_id: u64,
    pub station_id: u64,
    pub station_label: String,
    pub sensor_type: String,
    pub status: VerificationStatus,
    pub active_thresholds: usize,
    pub inactive_thresholds: usize,
    /// Levels configured with neither a minimum nor a maximum.
    pub unbounded_levels: Vec<ThresholdLevel>,
    pub known_sensor_type: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Single Configuration
// ============================================================================

/// Verifies one configuration in isolation.
///
/// Failed when the threshold batch would be rejected on save. Partial when it
/// is valid but has no active threshold, or some threshold has no bounds
/// (such a threshold never fires).
pub fn verify_configuration(configuration: &AlertConfiguration) -> ConfigurationVerification {
    let active_thresholds = configuration.active_thresholds().count();
    let mut result = ConfigurationVerification {
        configuration_id: configuration.id,
        station_id: configuration.station_id,
        station_label: configuration.station_label(),
        sensor_type: configuration.sensor_type.clone(),
        status: VerificationStatus::Failed,
        active_thresholds,
        inactive_thresholds: configuration.thresholds.len() - active_thresholds,
        unbounded_levels: configuration
            .thresholds
            .iter()
            .filter(|t| !t.has_bounds())
            .map(|t| t.level)
            .collect(),
        known_sensor_type: KNOWN_SENSOR_TYPES.contains(&configuration.sensor_type.as_str()),
        error_message: None,
    };

    if let Err(e) = validate_thresholds(&configuration.thresholds) {
        result.error_message = Some(e.to_string());
        return result;
    }

    result.status = if result.active_thresholds == 0 || !result.unbounded_levels.is_empty() {
        VerificationStatus::PartialSuccess
    } else {
        VerificationStatus::Success
    };
    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

/// Verifies a list of configurations, as read from a config file.
///
/// A second configuration for a (station, sensor type) already seen fails.
pub fn verify_configurations(
    configurations: &[AlertConfiguration],
    now: DateTime<Utc>,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: now.to_rfc3339(),
        results: Vec::with_capacity(configurations.len()),
        summary: VerificationSummary {
            total: configurations.len(),
            ..VerificationSummary::default()
        },
    };

    let mut seen = HashSet::new();
    for configuration in configurations {
        let mut result = verify_configuration(configuration);
        if !seen.insert((configuration.station_id, configuration.sensor_type.as_str()))
            && result.status != VerificationStatus::Failed
        {
            result.status = VerificationStatus::Failed;
            let err = ConfigError::AlreadyConfigured {
                station_id: configuration.station_id,
                sensor_type: configuration.sensor_type.clone(),
            };
            result.error_message = Some(err.to_string());
        }

        match result.status {
            VerificationStatus::Success => report.summary.working += 1,
            VerificationStatus::PartialSuccess => report.summary.partial += 1,
            VerificationStatus::Failed => report.summary.failed += 1,
        }
        report.results.push(result);
    }

    report
}

/// Verifies every configuration held by `registry`.
pub fn verify_registry(registry: &AlertRegistry) -> VerificationReport {
    verify_configurations(registry.all(), Utc::now())
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("ALERT CONFIGURATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for result in &report.results {
        let line = format!("{} / {}", result.station_label, result.sensor_type);
        match result.status {
            VerificationStatus::Success => {
                println!("  ✓ {line}: {} active thresholds", result.active_thresholds)
            }
            VerificationStatus::PartialSuccess => {
                if result.active_thresholds == 0 {
                    println!("  ⚠ {line}: no active thresholds");
                } else {
                    println!("  ⚠ {line}: thresholds without bounds {:?}", result.unbounded_levels);
                }
            }
            VerificationStatus::Failed => println!(
                "  ✗ {line}: {}",
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
        if !result.known_sensor_type {
            println!("    (unrecognised sensor type)");
        }
    }

    println!();
    let usable = report.summary.working + report.summary.partial;
    let rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Configurations:   {}/{} usable  ({} partial, {} failed)",
        usable, report.summary.total, report.summary.partial, report.summary.failed
    );
    println!("Fully alerting:   {:.1}%", rate);
    println!("═══════════════════════════════════════════════════════════");
}
