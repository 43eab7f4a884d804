//! Río Claro sensor alert monitor.
//!
//! Evaluates water-quality and hydrological sensor streams against
//! per-station alert configurations, confirms sustained breaches, and emits
//! each breach once.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod stations;
pub mod verify;
