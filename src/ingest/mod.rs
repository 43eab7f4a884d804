//! Measurement feed ingestion.
//!
//! Submodules:
//! - `measurements`: parses dashboard API measurement payloads and selects
//!   per-stream reading histories.

pub mod measurements;

pub use measurements::{FeedError, Measurement};
