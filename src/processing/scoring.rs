use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use super::emitter::BlinkEvent;
use crate::stream::GroundTruthBlink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// `[[TP, FN], [FP]]`; event streams have no true negatives.
    pub fn matrix(&self) -> Vec<Vec<usize>> {
        vec![
            vec![self.true_positives, self.false_negatives],
            vec![self.false_positives],
        ]
    }
}

impl Serialize for ConfusionCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let matrix = self.matrix();
        let mut seq = serializer.serialize_seq(Some(matrix.len()))?;
        for row in &matrix {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// Detection performance, every rate in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "F1 Score")]
    pub f1_score: f64,
    #[serde(rename = "Confusion Matrix")]
    pub confusion: ConfusionCounts,
}

impl Metrics {
    pub fn from_counts(counts: ConfusionCounts, total_ground_truth: usize) -> Self {
        let tp = counts.true_positives as f64;
        let fp = counts.false_positives as f64;
        let fn_ = counts.false_negatives as f64;

        // Zero ground truth scores 0 even with zero detections
        let accuracy = if total_ground_truth > 0 {
            tp / total_ground_truth as f64 * 100.0
        } else {
            0.0
        };
        let precision = if tp + fp > 0.0 {
            tp / (tp + fp) * 100.0
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0.0 {
            tp / (tp + fn_) * 100.0
        } else {
            0.0
        };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion: counts,
        }
    }
}

// SCORER COMPONENT ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccuracyScorer {
    pub tolerance: f64,
    /// Detections at or before this time are warm-up artefacts and never match.
    pub min_time: f64,
}

impl Default for AccuracyScorer {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            min_time: 0.5,
        }
    }
}

impl AccuracyScorer {
    pub fn new(tolerance: f64, min_time: f64) -> Self {
        Self {
            tolerance,
            min_time,
        }
    }

    /// One ground-truth blink may consume every detection inside its
    /// tolerance window; detections never consumed are false positives.
    pub fn count(
        &self,
        ground_truth: &[GroundTruthBlink],
        detections: &[BlinkEvent],
    ) -> ConfusionCounts {
        let mut used = vec![false; detections.len()];
        let mut counts = ConfusionCounts::default();

        for blink in ground_truth {
            let mut matched = false;
            for (index, detection) in detections.iter().enumerate() {
                if (detection.timestamp - blink.timestamp).abs() <= self.tolerance
                    && detection.timestamp > self.min_time
                {
                    used[index] = true;
                    matched = true;
                }
            }

            if matched {
                counts.true_positives += 1;
            } else {
                counts.false_negatives += 1;
            }
        }

        counts.false_positives = used.iter().filter(|&&u| !u).count();
        counts
    }

    pub fn score(&self, ground_truth: &[GroundTruthBlink], detections: &[BlinkEvent]) -> Metrics {
        Metrics::from_counts(self.count(ground_truth, detections), ground_truth.len())
    }
}
