pub mod dataset;
pub mod synthetic;

use serde::{Deserialize, Serialize};

/// One two-channel EEG sample (Fp1/Fp2 in the reference recordings).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub channel_a: f64,
    pub channel_b: f64,
}

impl Sample {
    pub fn new(timestamp: f64, channel_a: f64, channel_b: f64) -> Self {
        Self {
            timestamp,
            channel_a,
            channel_b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBlink {
    pub timestamp: f64,
    pub label: i64,
}

/// Closed time range excluded from detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorruptInterval {
    pub start: f64,
    pub end: f64,
}

impl CorruptInterval {
    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

pub fn is_corrupt(intervals: &[CorruptInterval], timestamp: f64) -> bool {
    intervals.iter().any(|interval| interval.contains(timestamp))
}

/// Ordered supply of samples plus the labels recorded alongside them.
pub trait StreamSource {
    /// Next sample in recording order, `None` at end of stream.
    fn next_sample(&mut self) -> Option<Sample>;

    fn is_corrupt(&self, timestamp: f64) -> bool;

    fn ground_truth_blinks(&self) -> &[GroundTruthBlink];

    fn sampling_rate(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_interval_bounds_are_inclusive() {
        let intervals = [
            CorruptInterval {
                start: 1.0,
                end: 2.0,
            },
            CorruptInterval {
                start: 5.0,
                end: 5.5,
            },
        ];
        assert!(is_corrupt(&intervals, 1.0));
        assert!(is_corrupt(&intervals, 2.0));
        assert!(is_corrupt(&intervals, 5.25));
        assert!(!is_corrupt(&intervals, 2.01));
        assert!(!is_corrupt(&intervals, 0.99));
        assert!(!is_corrupt(&[], 1.0));
    }
}
