//! Alert threshold evaluation.
//!
//! Submodules:
//! - `thresholds`: breach predicate, severity resolver, bound descriptions.
//! - `window`: trailing persistence window over recent readings.
//! - `emission`: per-stream deduplication of emitted breaches.
//! - `stalenesses`: age check for the latest reading.

pub mod emission;
pub mod stalenesses;
pub mod thresholds;
pub mod window;

pub use emission::{AlertSignature, EmissionContext, EmissionDecision, EmissionGate};
pub use thresholds::{describe_bounds, evaluate, is_breached, resolve_breach};
pub use window::window_readings;
