// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{BlinkError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub stream: StreamConfig,
    pub detector: DetectorConfig,
    pub correlation: CorrelationConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessorConfig {
    pub verbose: bool,
    pub enable_debug_logging: bool,
    pub log_file: String,
    /// Sleep one sampling period per sample to mimic live acquisition.
    pub realtime: bool,
    /// Bound of the reader -> worker channel in the threaded runner.
    pub channel_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            enable_debug_logging: false,
            log_file: "blink_detection.log".to_string(),
            realtime: false,
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub fs: f64,
    pub lowpass_cutoff_hz: f64,
    pub lowpass_order: usize,
    /// Recordings in the VR/VV layout are cut to this many seconds.
    pub max_duration_s: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fs: 250.0,
            lowpass_cutoff_hz: 10.0,
            lowpass_order: 4,
            max_duration_s: 200.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    pub window_seconds: f64,
    pub prominence: f64,
    pub distance: usize,
    pub stable_window: usize,
    pub stable_threshold: f64,
    pub baseline_threshold: f64,
    pub min_detection_gap: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.5,
            prominence: 100.0,
            distance: 10,
            stable_window: 50,
            stable_threshold: 50.0,
            baseline_threshold: 100.0,
            min_detection_gap: 0.25,
        }
    }
}

impl DetectorConfig {
    pub fn window_capacity(&self, fs: f64) -> usize {
        (self.window_seconds * fs).round() as usize
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CorrelationConfig {
    pub enabled: bool,
    pub batch_size: usize,
    pub segment_half_width: usize,
    pub corr_thresh: f64,
    pub power_thresh: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: 8,
            segment_half_width: 25,
            corr_thresh: 0.8,
            power_thresh: 1.5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub tolerance: f64,
    pub min_time: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            min_time: 0.5,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(self.stream.fs > 0.0) {
            return Err(BlinkError::InvalidConfig(format!(
                "sampling rate must be positive, got {}",
                self.stream.fs
            )));
        }
        if self.detector.window_capacity(self.stream.fs) == 0 {
            return Err(BlinkError::InvalidConfig(format!(
                "a {} s window holds no samples at {} Hz",
                self.detector.window_seconds, self.stream.fs
            )));
        }
        if self.detector.min_detection_gap < 0.0 {
            return Err(BlinkError::InvalidConfig(
                "min_detection_gap must not be negative".to_string(),
            ));
        }
        if self.scoring.tolerance < 0.0 {
            return Err(BlinkError::InvalidConfig(
                "scoring tolerance must not be negative".to_string(),
            ));
        }
        if self.correlation.enabled && self.correlation.batch_size < 2 {
            return Err(BlinkError::InvalidConfig(
                "correlation batch_size needs at least two segments".to_string(),
            ));
        }
        if self.processor.channel_capacity == 0 {
            return Err(BlinkError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}
