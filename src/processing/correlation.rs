use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::error::{BlinkError, Result};

/// Sample range `[start, end)` around one candidate trough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TroughSegment {
    pub start: usize,
    pub end: usize,
}

impl TroughSegment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// `half_width` samples either side of `trough`, if that fits in `len`.
    pub fn centered(trough: usize, half_width: usize, len: usize) -> Option<Self> {
        let start = trough.checked_sub(half_width)?;
        let end = trough + half_width;
        (end <= len).then_some(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense square matrix; similarity matrices only fill the strict upper
/// triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SquareMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.size + col] = value;
    }

    /// Mean over all entries, diagonal and lower triangle included. NaN for an
    /// empty matrix.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrices {
    /// Pearson correlation of segment shapes.
    pub corrmat: SquareMatrix,
    /// Ratio of segment standard deviations, always >= 1.
    pub powermat: SquareMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaAdjustment {
    MoreSensitive,
    LessSensitive,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypifyOutcome {
    pub mean_correlation: f64,
    pub mean_power: f64,
    pub adjustment: DeltaAdjustment,
    pub delta: f64,
}

// ANALYZER COMPONENT ----------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    pub corr_thresh: f64,
    pub power_thresh: f64,
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self {
            corr_thresh: 0.8,
            power_thresh: 1.5,
        }
    }
}

impl CorrelationAnalyzer {
    pub fn new(corr_thresh: f64, power_thresh: f64) -> Self {
        Self {
            corr_thresh,
            power_thresh,
        }
    }

    /// Pairwise shape and amplitude similarity of equally long segments.
    pub fn compute_correlation(
        &self,
        signal: &[f64],
        segments: &[TroughSegment],
    ) -> Result<SimilarityMatrices> {
        for (index, segment) in segments.iter().enumerate() {
            if segment.start > segment.end || segment.end > signal.len() {
                return Err(BlinkError::SegmentOutOfBounds {
                    index,
                    start: segment.start,
                    end: segment.end,
                    len: signal.len(),
                });
            }
            if segment.len() != segments[0].len() {
                return Err(BlinkError::SegmentLengthMismatch {
                    first: 0,
                    second: index,
                    first_len: segments[0].len(),
                    second_len: segment.len(),
                });
            }
        }

        let slices: Vec<&[f64]> = segments
            .iter()
            .map(|segment| &signal[segment.start..segment.end])
            .collect();

        let rows: Vec<Vec<(f64, f64)>> = (0..slices.len())
            .into_par_iter()
            .map(|i| {
                (i + 1..slices.len())
                    .map(|j| {
                        (
                            pearson(slices[i], slices[j]),
                            power_ratio(slices[i], slices[j]),
                        )
                    })
                    .collect()
            })
            .collect();

        let mut corrmat = SquareMatrix::zeros(slices.len());
        let mut powermat = SquareMatrix::zeros(slices.len());
        for (i, row) in rows.into_iter().enumerate() {
            for (offset, (corr, power)) in row.into_iter().enumerate() {
                corrmat.set(i, i + 1 + offset, corr);
                powermat.set(i, i + 1 + offset, power);
            }
        }

        Ok(SimilarityMatrices { corrmat, powermat })
    }

    /// Indices of segments in at least one pair that is both shape-similar and
    /// amplitude-similar, ascending.
    pub fn high_corr_comp(&self, matrices: &SimilarityMatrices) -> Vec<usize> {
        let size = matrices.corrmat.size();
        let mut index_blinks = BTreeSet::new();

        for i in 0..size {
            for j in i + 1..size {
                if matrices.corrmat.get(i, j) > self.corr_thresh
                    && matrices.powermat.get(i, j) < self.power_thresh
                {
                    index_blinks.insert(i);
                    index_blinks.insert(j);
                }
            }
        }

        index_blinks.into_iter().collect()
    }

    /// Adjusts the detection delta from the batch's average similarity. The
    /// averages run over the whole matrices, unpopulated entries included.
    pub fn blink_typify_and_adjust(
        &self,
        initial_delta: f64,
        matrices: &SimilarityMatrices,
    ) -> TypifyOutcome {
        let mean_correlation = matrices.corrmat.mean();
        let mean_power = matrices.powermat.mean();
        let (adjustment, delta) = adjust_delta(initial_delta, mean_correlation, mean_power);

        TypifyOutcome {
            mean_correlation,
            mean_power,
            adjustment,
            delta,
        }
    }
}

/// NaN means compare false everywhere and leave delta unchanged.
pub fn adjust_delta(
    initial_delta: f64,
    mean_correlation: f64,
    mean_power: f64,
) -> (DeltaAdjustment, f64) {
    if mean_correlation > 0.9 && mean_power < 1.2 {
        (DeltaAdjustment::MoreSensitive, initial_delta * 0.9)
    } else if mean_correlation < 0.7 || mean_power > 1.8 {
        (DeltaAdjustment::LessSensitive, initial_delta * 1.1)
    } else {
        (DeltaAdjustment::Unchanged, initial_delta)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let mean_a = mean(a);
    let mean_b = mean(b);

    let covariance: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x - mean_a) * (y - mean_b))
        .sum();
    let var_a: f64 = a.iter().map(|&x| (x - mean_a).powi(2)).sum();
    let var_b: f64 = b.iter().map(|&y| (y - mean_b).powi(2)).sum();

    // Avoid division by zero
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }

    covariance / (var_a.sqrt() * var_b.sqrt())
}

fn power_ratio(a: &[f64], b: &[f64]) -> f64 {
    let std_a = std_dev(a);
    let std_b = std_dev(b);

    match (std_a == 0.0, std_b == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => f64::INFINITY,
        (false, false) => (std_a / std_b).max(std_b / std_a),
    }
}

// ADAPTIVE TUNING COMPONENT ---------------------------------------------------

#[derive(Debug, Clone)]
pub struct AdaptiveTunerConfig {
    pub batch_size: usize,
    pub segment_half_width: usize,
}

/// Collects emitted troughs and, once a batch is complete, derives a new
/// detection delta from their similarity. Segment samples are copied out at
/// observation time, so callers only have to keep a short tail of history.
#[derive(Debug, Clone)]
pub struct AdaptiveTuner {
    analyzer: CorrelationAnalyzer,
    config: AdaptiveTunerConfig,
    /// Copied segment samples, back to back.
    pending_samples: Vec<f64>,
    /// Segments indexing into `pending_samples`.
    pending: Vec<TroughSegment>,
    delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retune {
    pub outcome: TypifyOutcome,
    pub similar_components: Vec<usize>,
}

impl AdaptiveTuner {
    pub fn new(
        analyzer: CorrelationAnalyzer,
        config: AdaptiveTunerConfig,
        initial_delta: f64,
    ) -> Self {
        Self {
            analyzer,
            config,
            pending_samples: Vec::new(),
            pending: Vec::new(),
            delta: initial_delta,
        }
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// `history[0]` is absolute sample `history_start`. Troughs whose segment
    /// does not lie inside `history` are dropped.
    pub fn observe(
        &mut self,
        trough_index: usize,
        history: &[f64],
        history_start: usize,
    ) -> Result<Option<Retune>> {
        let Some(local) = trough_index.checked_sub(history_start) else {
            return Ok(None);
        };
        let Some(segment) =
            TroughSegment::centered(local, self.config.segment_half_width, history.len())
        else {
            return Ok(None);
        };

        let offset = self.pending_samples.len();
        self.pending_samples
            .extend_from_slice(&history[segment.start..segment.end]);
        self.pending
            .push(TroughSegment::new(offset, offset + segment.len()));

        if self.pending.len() < self.config.batch_size {
            return Ok(None);
        }

        let matrices = self
            .analyzer
            .compute_correlation(&self.pending_samples, &self.pending)?;
        let similar_components = self.analyzer.high_corr_comp(&matrices);
        let outcome = self.analyzer.blink_typify_and_adjust(self.delta, &matrices);
        self.delta = outcome.delta;
        self.pending.clear();
        self.pending_samples.clear();

        Ok(Some(Retune {
            outcome,
            similar_components,
        }))
    }
}
