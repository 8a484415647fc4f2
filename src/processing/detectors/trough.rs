#[derive(Debug, Clone)]
pub struct TroughDetectorConfig {
    pub prominence: f64,
    pub distance: usize,
}

impl Default for TroughDetectorConfig {
    fn default() -> Self {
        Self {
            prominence: 100.0,
            distance: 10,
        }
    }
}

/// Finds local minima that are deep enough and far enough apart to be blink
/// candidates.
#[derive(Debug, Clone)]
pub struct TroughDetector {
    config: TroughDetectorConfig,
}

impl TroughDetector {
    pub fn new(config: TroughDetectorConfig) -> Self {
        Self { config }
    }

    pub fn prominence(&self) -> f64 {
        self.config.prominence
    }

    pub fn set_prominence(&mut self, prominence: f64) {
        self.config.prominence = prominence;
    }

    /// Ascending window indices of accepted troughs.
    pub fn detect(&self, signal: &[f64]) -> Vec<usize> {
        if signal.len() < 3 || signal.len() < self.config.distance {
            return Vec::new();
        }

        // Troughs are searched as peaks of the inverted signal
        let inverted: Vec<f64> = signal.iter().map(|&v| -v).collect();

        let candidates: Vec<(usize, f64)> = local_maxima(&inverted)
            .into_iter()
            .map(|peak| (peak, peak_prominence(&inverted, peak)))
            .filter(|&(_, prominence)| prominence >= self.config.prominence)
            .collect();

        select_by_distance(&candidates, self.config.distance)
    }
}

/// Indices of local maxima. A flat top counts once, at its middle sample
/// (rounded down); the first and last samples never qualify.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                peaks.push((i + i_ahead - 1) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Height of `peak` above the higher of its two bases. Each base is the
/// lowest point reached before the signal climbs above the peak (or ends).
fn peak_prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &value in x[..=peak].iter().rev() {
        if value > height {
            break;
        }
        left_min = left_min.min(value);
    }

    let mut right_min = height;
    for &value in &x[peak..] {
        if value > height {
            break;
        }
        right_min = right_min.min(value);
    }

    height - left_min.max(right_min)
}

/// Greedy minimum-distance filter: the most prominent candidate wins every
/// conflict, and of two equally prominent ones the later. `candidates` must
/// be sorted by index.
fn select_by_distance(candidates: &[(usize, f64)], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; candidates.len()];

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .1
            .partial_cmp(&candidates[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.cmp(&a))
    });

    for &j in &order {
        if !keep[j] {
            continue;
        }
        let index = candidates[j].0;

        for k in (0..j).rev() {
            if index - candidates[k].0 >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..candidates.len() {
            if candidates[k].0 - index >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&(index, _), kept)| kept.then_some(index))
        .collect()
}
