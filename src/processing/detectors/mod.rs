pub mod stability;
pub mod trough;

use std::collections::VecDeque;

use crate::stream::Sample;

// BUFFER COMPONENT ------------------------------------------------------------

/// Most recent `capacity` samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SlidingWindowBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Window of `round(seconds * fs)` samples.
    pub fn with_duration(seconds: f64, fs: f64) -> Self {
        Self::new((seconds * fs).round() as usize)
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the channel used for trough search.
    pub fn channel_a(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.channel_a).collect()
    }

    pub fn channel_b(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.channel_b).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Sample {
        Sample::new(i as f64 / 250.0, i as f64, -(i as f64))
    }

    #[test]
    fn test_window_capacity_from_duration() {
        assert_eq!(SlidingWindowBuffer::with_duration(0.5, 250.0).capacity(), 125);
        assert_eq!(SlidingWindowBuffer::with_duration(0.5, 255.0).capacity(), 128);
    }

    #[test]
    fn test_push_evicts_oldest_when_full() {
        let mut window = SlidingWindowBuffer::new(3);
        for i in 0..2 {
            window.push(sample(i));
        }
        assert!(!window.is_full());

        for i in 2..6 {
            window.push(sample(i));
            assert!(window.len() <= 3);
        }
        assert!(window.is_full());
        assert_eq!(window.channel_a(), vec![3.0, 4.0, 5.0]);
        assert_eq!(window.channel_b(), vec![-3.0, -4.0, -5.0]);
    }
}
