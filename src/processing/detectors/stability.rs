#[derive(Debug, Clone)]
pub struct StabilityValidatorConfig {
    /// Samples examined on each side of a trough.
    pub stable_window: usize,
    /// Largest absolute slope still counted as stable.
    pub stable_threshold: f64,
    /// Largest allowed distance between the recovery point and the
    /// pre-trough mean.
    pub baseline_threshold: f64,
}

impl Default for StabilityValidatorConfig {
    fn default() -> Self {
        Self {
            stable_window: 50,
            stable_threshold: 50.0,
            baseline_threshold: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTrough {
    pub source_index: usize,
    pub center_index: usize,
}

/// Why a candidate trough was dropped. Rejections are filtered out, they
/// never abort validation of the remaining candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NearEdge,
    UnstableBefore,
    UnstableAfter,
    NoBaselineRecovery,
}

pub struct StabilityValidator {
    config: StabilityValidatorConfig,
}

impl StabilityValidator {
    pub fn new(config: StabilityValidatorConfig) -> Self {
        Self { config }
    }

    /// Keeps the candidates that settle on both sides and return to baseline.
    pub fn validate(&self, signal: &[f64], candidates: &[usize]) -> Vec<ValidatedTrough> {
        candidates
            .iter()
            .filter_map(|&trough| self.validate_candidate(signal, trough).ok())
            .collect()
    }

    pub fn validate_candidate(
        &self,
        signal: &[f64],
        trough: usize,
    ) -> Result<ValidatedTrough, Rejection> {
        let window = self.config.stable_window;
        if trough + window >= signal.len() {
            return Err(Rejection::NearEdge);
        }

        let pre_start = trough.saturating_sub(window);
        let pre_trough = &signal[pre_start..trough];
        let post_trough = &signal[trough..trough + window];

        let threshold = self.config.stable_threshold;
        let last_stable_before = gradient(pre_trough)
            .iter()
            .rposition(|slope| slope.abs() < threshold)
            .ok_or(Rejection::UnstableBefore)?;
        let first_stable_after = gradient(post_trough)
            .iter()
            .position(|slope| slope.abs() < threshold)
            .ok_or(Rejection::UnstableAfter)?;

        let stable_point_before = pre_start + last_stable_before;
        let stable_point_after = trough + first_stable_after;
        let center_index = (stable_point_before + stable_point_after) / 2;

        let local_baseline = pre_trough.iter().sum::<f64>() / pre_trough.len() as f64;
        if (signal[stable_point_after] - local_baseline).abs() >= self.config.baseline_threshold {
            return Err(Rejection::NoBaselineRecovery);
        }

        Ok(ValidatedTrough {
            source_index: trough,
            center_index,
        })
    }
}

/// Discrete first derivative: central differences inside, one-sided at the
/// ends. Fewer than two samples have no defined slope.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }

    let mut slopes = Vec::with_capacity(n);
    slopes.push(values[1] - values[0]);
    for i in 1..n - 1 {
        slopes.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    slopes.push(values[n - 1] - values[n - 2]);
    slopes
}
