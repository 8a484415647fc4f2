use super::detectors::stability::{
    StabilityValidator, StabilityValidatorConfig, ValidatedTrough,
};
use super::detectors::trough::{TroughDetector, TroughDetectorConfig};
use super::detectors::SlidingWindowBuffer;
use super::emitter::{BlinkEvent, BlinkEventEmitter};
use crate::config::DetectorConfig;
use crate::stream::Sample;

// -----------------------------------------------------------------------------
// RUST CORE LOGIC
// -----------------------------------------------------------------------------

/// An emitted event together with the absolute sample indices it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub event: BlinkEvent,
    pub trough_index: usize,
    pub center_index: usize,
}

/// Owns all detection state for one stream: the window, the trough search,
/// the stability check and the emitter's de-duplication clock.
pub struct BlinkDetector {
    window: SlidingWindowBuffer,
    troughs: TroughDetector,
    validator: StabilityValidator,
    emitter: BlinkEventEmitter,
    samples_seen: usize,
}

impl BlinkDetector {
    pub fn new(config: &DetectorConfig, fs: f64) -> Self {
        BlinkDetector {
            window: SlidingWindowBuffer::with_duration(config.window_seconds, fs),
            troughs: TroughDetector::new(TroughDetectorConfig {
                prominence: config.prominence,
                distance: config.distance,
            }),
            validator: StabilityValidator::new(StabilityValidatorConfig {
                stable_window: config.stable_window,
                stable_threshold: config.stable_threshold,
                baseline_threshold: config.baseline_threshold,
            }),
            emitter: BlinkEventEmitter::new(fs, config.min_detection_gap),
            samples_seen: 0,
        }
    }

    /// Buffers one sample and, once the window is full, runs trough search,
    /// validation and emission over it.
    pub fn process(&mut self, sample: Sample) -> Vec<Detection> {
        self.samples_seen += 1;
        self.window.push(sample);

        if !self.window.is_full() {
            return Vec::new();
        }

        let signal_window = self.window.channel_a();
        let candidates = self.troughs.detect(&signal_window);
        let validated = self.validator.validate(&signal_window, &candidates);

        let offset = self.samples_seen - self.window.len();
        validated
            .into_iter()
            .filter_map(|ValidatedTrough { source_index, center_index }| {
                self.emitter
                    .emit(offset, center_index)
                    .map(|event| Detection {
                        event,
                        trough_index: offset + source_index,
                        center_index: offset + center_index,
                    })
            })
            .collect()
    }

    /// Counts a sample that is excluded from detection (corrupt interval)
    /// so later timestamps stay on the recording's clock.
    pub fn skip(&mut self) {
        self.samples_seen += 1;
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    pub fn prominence(&self) -> f64 {
        self.troughs.prominence()
    }

    /// Applies an adapted delta to subsequent windows.
    pub fn set_prominence(&mut self, prominence: f64) {
        self.troughs.set_prominence(prominence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 250.0;

    fn blink_signal(len: usize, centers: &[usize]) -> Vec<f64> {
        let mut signal = vec![0.0; len];
        for &center in centers {
            for k in 0..6 {
                let value = -400.0 * (1.0 - k as f64 / 6.0);
                signal[center - k] = value;
                signal[center + k] = value;
            }
        }
        signal
    }

    fn run(detector: &mut BlinkDetector, signal: &[f64]) -> Vec<Detection> {
        signal
            .iter()
            .enumerate()
            .flat_map(|(i, &v)| detector.process(Sample::new(i as f64 / FS, v, v)))
            .collect()
    }

    #[test]
    fn test_nothing_before_window_fills() {
        let mut detector = BlinkDetector::new(&DetectorConfig::default(), FS);
        let detections = run(&mut detector, &blink_signal(124, &[60]));
        assert!(detections.is_empty());
        assert_eq!(detector.samples_seen(), 124);
    }

    #[test]
    fn test_each_blink_is_emitted_once() {
        let mut detector = BlinkDetector::new(&DetectorConfig::default(), FS);
        let detections = run(&mut detector, &blink_signal(1000, &[200, 500, 800]));

        let troughs: Vec<usize> = detections.iter().map(|d| d.trough_index).collect();
        assert_eq!(troughs, vec![200, 500, 800]);
        for (detection, expected) in detections.iter().zip([0.8, 2.0, 3.2]) {
            assert_eq!(detection.center_index, detection.trough_index);
            assert!((detection.event.timestamp - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_skipped_samples_keep_the_clock() {
        let mut detector = BlinkDetector::new(&DetectorConfig::default(), FS);
        for _ in 0..100 {
            detector.skip();
        }
        let detections = run(&mut detector, &blink_signal(400, &[200]));
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].trough_index, 300);
        assert!((detections[0].event.timestamp - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_raising_prominence_hides_blinks() {
        let mut detector = BlinkDetector::new(&DetectorConfig::default(), FS);
        detector.set_prominence(500.0);
        assert_eq!(detector.prominence(), 500.0);
        assert!(run(&mut detector, &blink_signal(600, &[300])).is_empty());
    }
}
