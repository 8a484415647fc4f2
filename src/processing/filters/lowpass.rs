use super::FilterInstance;
use crate::error::{BlinkError, Result};

// Second-order low-pass section (RBJ cookbook form), normalised by a0.
struct SecondOrderSection {
    a: [f64; 3],
    b: [f64; 3],
    x: [f64; 2],
    y: [f64; 2],
}

impl SecondOrderSection {
    fn low_pass(f0: f64, fs: f64, q: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * f0 / fs;
        let alpha = f64::sin(omega) / (2.0 * q);
        let cos_omega = f64::cos(omega);

        let a0 = 1.0 + alpha;
        SecondOrderSection {
            a: [1.0, -2.0 * cos_omega / a0, (1.0 - alpha) / a0],
            b: [
                (1.0 - cos_omega) / 2.0 / a0,
                (1.0 - cos_omega) / a0,
                (1.0 - cos_omega) / 2.0 / a0,
            ],
            x: [0.0, 0.0],
            y: [0.0, 0.0],
        }
    }

    fn calculate_output(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[1] * self.y[0]
            - self.a[2] * self.y[1];

        self.x[1] = self.x[0];
        self.x[0] = input;
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }
}

// First-order bilinear section, needed for odd orders.
struct FirstOrderSection {
    b: f64,
    a1: f64,
    x: f64,
    y: f64,
}

impl FirstOrderSection {
    fn low_pass(f0: f64, fs: f64) -> Self {
        let k = (std::f64::consts::PI * f0 / fs).tan();
        FirstOrderSection {
            b: k / (1.0 + k),
            a1: (k - 1.0) / (k + 1.0),
            x: 0.0,
            y: 0.0,
        }
    }

    fn calculate_output(&mut self, input: f64) -> f64 {
        let output = self.b * input + self.b * self.x - self.a1 * self.y;
        self.x = input;
        self.y = output;
        output
    }
}

enum Section {
    First(FirstOrderSection),
    Second(SecondOrderSection),
}

/// Digital Butterworth low-pass of arbitrary order, built from cascaded
/// sections. Starts from a zero state, so a whole-signal pass behaves like a
/// causal `lfilter`.
pub struct ButterworthLowPass {
    sections: Vec<Section>,
}

impl ButterworthLowPass {
    pub fn new(cutoff_hz: f64, fs: f64, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(BlinkError::InvalidConfig(
                "low-pass order must be at least 1".to_string(),
            ));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < fs / 2.0) {
            return Err(BlinkError::InvalidConfig(format!(
                "low-pass cutoff {} Hz must lie in (0, {}) Hz",
                cutoff_hz,
                fs / 2.0
            )));
        }

        // Pole pair k of an order-n Butterworth has Q = 1 / (2 sin((2k+1)pi / 2n))
        let n = order as f64;
        let mut sections: Vec<Section> = (0..order / 2)
            .map(|k| {
                let theta = (2 * k + 1) as f64 * std::f64::consts::PI / (2.0 * n);
                let q = 1.0 / (2.0 * theta.sin());
                Section::Second(SecondOrderSection::low_pass(cutoff_hz, fs, q))
            })
            .collect();
        if order % 2 == 1 {
            sections.push(Section::First(FirstOrderSection::low_pass(cutoff_hz, fs)));
        }

        Ok(Self { sections })
    }
}

impl FilterInstance for ButterworthLowPass {
    fn filter_sample(&mut self, sample: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(sample, |value, section| match section {
                Section::First(s) => s.calculate_output(value),
                Section::Second(s) => s.calculate_output(value),
            })
    }
}

/// Filters a whole signal once, as done for each channel before streaming.
pub fn lowpass(signal: &[f64], cutoff_hz: f64, fs: f64, order: usize) -> Result<Vec<f64>> {
    let mut filter = ButterworthLowPass::new(cutoff_hz, fs, order)?;
    Ok(signal.iter().map(|&x| filter.filter_sample(x)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn peak_after(signal: &[f64], skip: usize) -> f64 {
        signal[skip..].iter().fold(0.0f64, |m, v| m.max(v.abs()))
    }

    #[test]
    fn test_dc_passes_with_unit_gain() {
        let out = lowpass(&vec![1.0; 2000], 10.0, 250.0, 4).unwrap();
        assert!((out[1999] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_high_frequency_is_attenuated() {
        let out = lowpass(&sine(100.0, 250.0, 2000), 10.0, 250.0, 4).unwrap();
        assert!(peak_after(&out, 500) < 0.01);
    }

    #[test]
    fn test_passband_tone_survives() {
        let out = lowpass(&sine(2.0, 250.0, 3000), 10.0, 250.0, 4).unwrap();
        let peak = peak_after(&out, 1000);
        assert!(peak > 0.95 && peak < 1.05, "peak was {}", peak);
    }

    #[test]
    fn test_odd_order_has_unit_dc_gain() {
        let out = lowpass(&vec![2.5; 2000], 10.0, 250.0, 3).unwrap();
        assert!((out[1999] - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_starts_from_zero_state() {
        let out = lowpass(&[1.0, 0.0, 0.0], 10.0, 250.0, 4).unwrap();
        assert!(out[0] > 0.0 && out[0] < 0.01);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(ButterworthLowPass::new(10.0, 250.0, 0).is_err());
        assert!(ButterworthLowPass::new(0.0, 250.0, 4).is_err());
        assert!(ButterworthLowPass::new(125.0, 250.0, 4).is_err());
    }
}
