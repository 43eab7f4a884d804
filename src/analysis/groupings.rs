//! Per-stream grouping of feed output.
//!
//! The "latest measurements" endpoint returns every sensor of every station
//! in one flat list. The monitor evaluates one (station, sensor type) stream
//! at a time, so the list is split here.

use std::collections::BTreeMap;

use crate::ingest::measurements::{Measurement, most_recent};
use crate::model::Reading;

/// Identifies one monitored stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamKey {
    pub station_id: u64,
    pub sensor_type: String,
}

impl StreamKey {
    pub fn new(station_id: u64, sensor_type: impl Into<String>) -> Self {
        Self {
            station_id,
            sensor_type: sensor_type.into(),
        }
    }
}

/// Groups `measurements` by stream, keeping at most `limit` of the most
/// recent readings per stream in chronological order.
///
/// Streams are ordered by station id, then sensor type.
pub fn group_by_stream(measurements: &[Measurement], limit: usize) -> BTreeMap<StreamKey, Vec<Reading>> {
    let mut buckets: BTreeMap<StreamKey, Vec<&Measurement>> = BTreeMap::new();
    for measurement in measurements {
        buckets
            .entry(StreamKey::new(measurement.station_id, measurement.variable_type.as_str()))
            .or_default()
            .push(measurement);
    }

    buckets
        .into_iter()
        .map(|(key, bucket)| (key, most_recent(bucket, limit)))
        .collect()
}
