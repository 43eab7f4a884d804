//! Direction of the most recent change in a stream.

use crate::model::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Steady => "steady",
        }
    }
}

/// Compares the last two readings of a chronological history. Fewer than
/// two readings is `Steady`.
pub fn trend(readings: &[Reading]) -> Trend {
    match readings {
        [.., previous, latest] if latest.value > previous.value => Trend::Rising,
        [.., previous, latest] if latest.value < previous.value => Trend::Falling,
        _ => Trend::Steady,
    }
}
