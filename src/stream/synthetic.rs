use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use super::{is_corrupt, CorruptInterval, GroundTruthBlink, Sample, StreamSource};

const DRIFT_FREQ: f64 = 0.1; // Hz
const ALPHA_FREQ: f64 = 10.0; // Hz

// -----------------------------------------------------------------------------
// SIMULATING DATA
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub duration_s: f64,
    pub fs: f64,
    pub blink_count: usize,
    /// Trough depth below baseline.
    pub depth: f64,
    /// Samples from trough to baseline on each side.
    pub half_width: usize,
    /// Uniform noise amplitude.
    pub noise: f64,
    /// Amplitude of the slow baseline wander.
    pub drift: f64,
    /// Minimum time between injected blinks.
    pub min_separation_s: f64,
    /// Blink-free lead-in and tail.
    pub margin_s: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            duration_s: 60.0,
            fs: 250.0,
            blink_count: 20,
            depth: 400.0,
            half_width: 6,
            noise: 5.0,
            drift: 20.0,
            min_separation_s: 1.0,
            margin_s: 1.0,
        }
    }
}

/// Seeded two-channel recording with V-shaped blink troughs on a noisy,
/// slowly drifting baseline.
pub struct SyntheticStream {
    samples: Vec<Sample>,
    corrupt_intervals: Vec<CorruptInterval>,
    blinks: Vec<GroundTruthBlink>,
    fs: f64,
    current_index: usize,
}

impl SyntheticStream {
    pub fn new(config: &SyntheticConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let len = (config.duration_s * config.fs).round() as usize;
        let blink_indices = place_blinks(&mut rng, config, len);

        let mut channel_a = vec![0.0; len];
        let mut channel_b = vec![0.0; len];
        for i in 0..len {
            let time = i as f64 / config.fs;
            let background = config.drift * (2.0 * std::f64::consts::PI * DRIFT_FREQ * time).sin()
                + 0.2 * config.drift * (2.0 * std::f64::consts::PI * ALPHA_FREQ * time).sin();
            channel_a[i] = background + noise(&mut rng, config.noise);
            channel_b[i] = background + noise(&mut rng, config.noise);
        }

        let half_width = config.half_width.max(1);
        for &center in &blink_indices {
            for k in 0..half_width {
                let value = config.depth * (1.0 - k as f64 / half_width as f64);
                channel_a[center - k] -= value;
                channel_b[center - k] -= value;
                if k > 0 {
                    channel_a[center + k] -= value;
                    channel_b[center + k] -= value;
                }
            }
        }

        let samples = channel_a
            .into_iter()
            .zip(channel_b)
            .enumerate()
            .map(|(i, (a, b))| Sample::new(i as f64 / config.fs, a, b))
            .collect();

        let blinks = blink_indices
            .iter()
            .map(|&index| GroundTruthBlink {
                timestamp: index as f64 / config.fs,
                label: 0,
            })
            .collect();

        Self {
            samples,
            corrupt_intervals: Vec::new(),
            blinks,
            fs: config.fs,
            current_index: 0,
        }
    }

    pub fn with_corrupt_interval(mut self, interval: CorruptInterval) -> Self {
        self.corrupt_intervals.push(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl StreamSource for SyntheticStream {
    fn next_sample(&mut self) -> Option<Sample> {
        let sample = self.samples.get(self.current_index).copied()?;
        self.current_index += 1;
        Some(sample)
    }

    fn is_corrupt(&self, timestamp: f64) -> bool {
        is_corrupt(&self.corrupt_intervals, timestamp)
    }

    fn ground_truth_blinks(&self) -> &[GroundTruthBlink] {
        &self.blinks
    }

    fn sampling_rate(&self) -> f64 {
        self.fs
    }
}

fn noise(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

/// Picks distinct slots of width 1.5x the separation and jitters each blink
/// inside its slot, so neighbours are never closer than `min_separation_s`.
fn place_blinks(rng: &mut StdRng, config: &SyntheticConfig, len: usize) -> Vec<usize> {
    let separation = (config.min_separation_s * config.fs).round().max(1.0) as usize;
    let slot = separation + separation / 2;
    let margin = ((config.margin_s * config.fs).round() as usize).max(config.half_width);
    if len <= 2 * margin + slot {
        return Vec::new();
    }

    let slots = (len - 2 * margin) / slot;
    let count = config.blink_count.min(slots);
    let mut chosen = index::sample(rng, slots, count).into_vec();
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|s| margin + s * slot + rng.gen_range(0..=slot - separation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let config = SyntheticConfig {
            seed: 42,
            duration_s: 10.0,
            blink_count: 4,
            ..SyntheticConfig::default()
        };
        let mut a = SyntheticStream::new(&config);
        let mut b = SyntheticStream::new(&config);
        assert_eq!(a.ground_truth_blinks(), b.ground_truth_blinks());
        for _ in 0..a.len() {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn test_blinks_are_separated_and_inside_margins() {
        let config = SyntheticConfig {
            seed: 7,
            duration_s: 30.0,
            blink_count: 15,
            ..SyntheticConfig::default()
        };
        let stream = SyntheticStream::new(&config);
        let blinks = stream.ground_truth_blinks();

        assert_eq!(blinks.len(), 15);
        assert!(blinks[0].timestamp >= config.margin_s);
        assert!(blinks[blinks.len() - 1].timestamp <= config.duration_s - config.margin_s);
        for pair in blinks.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= config.min_separation_s - 1e-9);
        }
    }

    #[test]
    fn test_blink_count_is_capped_by_duration() {
        let config = SyntheticConfig {
            duration_s: 5.0,
            blink_count: 100,
            ..SyntheticConfig::default()
        };
        let stream = SyntheticStream::new(&config);
        // 3 s of usable signal fits two 1.5 s slots
        assert_eq!(stream.ground_truth_blinks().len(), 2);
    }

    #[test]
    fn test_trough_sits_at_ground_truth() {
        let config = SyntheticConfig {
            seed: 1,
            duration_s: 5.0,
            blink_count: 1,
            noise: 0.0,
            drift: 0.0,
            ..SyntheticConfig::default()
        };
        let mut stream = SyntheticStream::new(&config);
        let blink = stream.ground_truth_blinks()[0];
        let samples: Vec<Sample> = std::iter::from_fn(|| stream.next_sample()).collect();

        let lowest = samples
            .iter()
            .min_by(|x, y| x.channel_a.total_cmp(&y.channel_a))
            .unwrap();
        assert_eq!(lowest.timestamp, blink.timestamp);
        assert_eq!(lowest.channel_a, -400.0);
        assert_eq!(samples.len(), 1250);
    }

    #[test]
    fn test_corrupt_interval_is_reported() {
        let stream = SyntheticStream::new(&SyntheticConfig::default()).with_corrupt_interval(
            CorruptInterval {
                start: 3.0,
                end: 4.0,
            },
        );
        assert!(stream.is_corrupt(3.5));
        assert!(!stream.is_corrupt(4.5));
    }
}
