//! Data organization utilities for the alert monitor.
//!
//! This module provides basic grouping and trend helpers over ingested
//! measurements. Charting, statistics and report export belong to the
//! dashboard and are not handled here.
//!
//! Submodules:
//! - `groupings`: organizes flat feed output into per-stream histories.
//! - `trend`: direction of the latest change in a stream.

pub mod groupings;
pub mod trend;
