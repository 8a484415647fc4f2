use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlinkType {
    Normal,
    Stimulation,
    Soft,
}

impl BlinkType {
    /// Integer label used in the annotation files.
    pub fn label(&self) -> i64 {
        match self {
            BlinkType::Normal => 0,
            BlinkType::Stimulation => 1,
            BlinkType::Soft => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkEvent {
    pub timestamp: f64,
    pub blink_type: BlinkType,
    pub confidence: f64,
}

impl BlinkEvent {
    pub fn new(timestamp: f64, blink_type: BlinkType, confidence: f64) -> Self {
        Self {
            timestamp,
            blink_type,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// EMITTER COMPONENT -----------------------------------------------------------

/// Turns validated trough centers into timestamped events, dropping any that
/// fall within `min_detection_gap` of the last emitted event.
#[derive(Debug, Clone)]
pub struct BlinkEventEmitter {
    fs: f64,
    min_detection_gap: f64,
    last_emitted_timestamp: f64,
}

impl BlinkEventEmitter {
    pub fn new(fs: f64, min_detection_gap: f64) -> Self {
        Self {
            fs,
            min_detection_gap,
            last_emitted_timestamp: f64::NEG_INFINITY,
        }
    }

    /// `window_offset` is the absolute index of the window's first sample.
    pub fn emit(&mut self, window_offset: usize, center_index: usize) -> Option<BlinkEvent> {
        let timestamp = (window_offset + center_index) as f64 / self.fs;

        if timestamp - self.last_emitted_timestamp < self.min_detection_gap {
            return None;
        }

        self.last_emitted_timestamp = timestamp;
        Some(BlinkEvent::new(timestamp, BlinkType::Normal, 1.0))
    }

    pub fn last_emitted_timestamp(&self) -> Option<f64> {
        self.last_emitted_timestamp
            .is_finite()
            .then_some(self.last_emitted_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_first_event_always_emitted() {
        let mut emitter = BlinkEventEmitter::new(250.0, 0.25);
        assert_eq!(emitter.last_emitted_timestamp(), None);

        let event = emitter.emit(0, 0).unwrap();
        assert_eq!(event.timestamp, 0.0);
        assert_eq!(event.blink_type, BlinkType::Normal);
        assert_eq!(event.confidence, 1.0);
    }

    #[test]
    fn test_redetection_inside_gap_is_suppressed() {
        let mut emitter = BlinkEventEmitter::new(250.0, 0.25);
        assert!(emitter.emit(1000, 60).is_some()); // 4.24 s
        assert!(emitter.emit(1001, 59).is_none()); // same trough, next window
        assert!(emitter.emit(1050, 60).is_none()); // 4.44 s
        let event = emitter.emit(1060, 64).unwrap(); // 4.496 s
        assert!((event.timestamp - 4.496).abs() < 1e-9);
        assert_eq!(emitter.last_emitted_timestamp(), Some(event.timestamp));
    }

    #[test]
    fn test_suppressed_events_do_not_move_the_reference() {
        let mut emitter = BlinkEventEmitter::new(100.0, 0.25);
        assert!(emitter.emit(0, 100).is_some()); // 1.00
        assert!(emitter.emit(0, 120).is_none()); // 1.20
        // Measured against 1.00, not the suppressed 1.20
        assert!(emitter.emit(0, 126).is_some());
    }

    #[test]
    fn test_emitted_events_respect_minimum_gap() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut emitter = BlinkEventEmitter::new(250.0, 0.25);
        let mut offset = 0;
        let mut events = Vec::new();
        for _ in 0..2000 {
            offset += 1;
            let center = rng.gen_range(0..125);
            events.extend(emitter.emit(offset, center));
        }
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 0.25);
        }
    }

    #[test]
    fn test_blink_type_labels() {
        assert_eq!(BlinkType::Normal.label(), 0);
        assert_eq!(BlinkType::Stimulation.label(), 1);
        assert_eq!(BlinkType::Soft.label(), 2);
    }
}
