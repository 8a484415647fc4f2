use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::processing::blink_detector::{BlinkDetector, Detection};
use crate::processing::correlation::{AdaptiveTuner, AdaptiveTunerConfig, CorrelationAnalyzer};
use crate::processing::emitter::BlinkEvent;
use crate::processing::scoring::{AccuracyScorer, Metrics};
use crate::stream::dataset::DatasetStream;
use crate::stream::{GroundTruthBlink, Sample, StreamSource};
use crate::utils::log::log_to_file;

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub events: Vec<BlinkEvent>,
    pub metrics: Metrics,
    /// Samples that reached the detector.
    pub samples_processed: usize,
    /// Samples dropped because they fell inside a corrupt interval.
    pub samples_skipped: usize,
    pub final_prominence: f64,
    pub retunes: usize,
}

/// Detection state for one stream plus everything needed to score it.
pub struct Session {
    detector: BlinkDetector,
    tuner: Option<AdaptiveTuner>,
    scorer: AccuracyScorer,
    /// Recent channel A, only kept while tuning. `history[0]` is absolute
    /// sample `history_start`.
    history: Vec<f64>,
    history_start: usize,
    /// Oldest samples a future trough segment can reach: one window plus a
    /// segment half width.
    history_keep: usize,
    events: Vec<BlinkEvent>,
    samples_skipped: usize,
    retunes: usize,
    verbose: bool,
    debug_logging: bool,
    log_file: String,
}

impl Session {
    /// `fs` is the stream's sampling rate and overrides `config.stream.fs`.
    pub fn new(config: &Config, fs: f64) -> Result<Self> {
        let mut config = config.clone();
        config.stream.fs = fs;
        config.validate()?;

        let tuner = config.correlation.enabled.then(|| {
            AdaptiveTuner::new(
                CorrelationAnalyzer::new(
                    config.correlation.corr_thresh,
                    config.correlation.power_thresh,
                ),
                AdaptiveTunerConfig {
                    batch_size: config.correlation.batch_size,
                    segment_half_width: config.correlation.segment_half_width,
                },
                config.detector.prominence,
            )
        });

        let session = Session {
            detector: BlinkDetector::new(&config.detector, fs),
            tuner,
            scorer: AccuracyScorer::new(config.scoring.tolerance, config.scoring.min_time),
            history: Vec::new(),
            history_start: 0,
            history_keep: config.detector.window_capacity(fs)
                + config.correlation.segment_half_width,
            events: Vec::new(),
            samples_skipped: 0,
            retunes: 0,
            verbose: config.processor.verbose,
            debug_logging: config.processor.enable_debug_logging,
            log_file: config.processor.log_file.clone(),
        };

        session.debug(&format!(
            "Session started: fs={} Hz, window={} s, prominence={}, adaptive={}",
            fs,
            config.detector.window_seconds,
            config.detector.prominence,
            config.correlation.enabled
        ))?;

        Ok(session)
    }

    /// Pushes one sample through the detector and returns the events it
    /// emitted. Corrupt samples only advance the clock.
    pub fn feed(&mut self, sample: Sample, corrupt: bool) -> Result<Vec<BlinkEvent>> {
        if self.tuner.is_some() {
            self.push_history(sample.channel_a);
        }

        if corrupt {
            self.detector.skip();
            self.samples_skipped += 1;
            return Ok(Vec::new());
        }

        let detections = self.detector.process(sample);
        let mut emitted = Vec::with_capacity(detections.len());
        for detection in detections {
            self.record(&detection)?;
            emitted.push(detection.event);
        }
        Ok(emitted)
    }

    fn push_history(&mut self, value: f64) {
        self.history.push(value);
        // Drain in blocks so trimming stays amortised
        if self.history.len() > 2 * self.history_keep {
            let excess = self.history.len() - self.history_keep;
            self.history.drain(..excess);
            self.history_start += excess;
        }
    }

    fn record(&mut self, detection: &Detection) -> Result<()> {
        if self.verbose {
            println!(
                "Blink detected at {:.2}s with confidence {:.2}",
                detection.event.timestamp, detection.event.confidence
            );
        }
        self.debug(&format!(
            "Detection: t={:.3}s trough={} center={}",
            detection.event.timestamp, detection.trough_index, detection.center_index
        ))?;
        self.events.push(detection.event);

        let retune = match self.tuner.as_mut() {
            Some(tuner) => {
                tuner.observe(detection.trough_index, &self.history, self.history_start)?
            }
            None => None,
        };

        if let Some(retune) = retune {
            self.detector.set_prominence(retune.outcome.delta);
            self.retunes += 1;
            self.debug(&format!(
                "Retune {:?}: corr={:.3} power={:.3} delta={:.2} similar={:?}",
                retune.outcome.adjustment,
                retune.outcome.mean_correlation,
                retune.outcome.mean_power,
                retune.outcome.delta,
                retune.similar_components
            ))?;
        }

        Ok(())
    }

    fn debug(&self, message: &str) -> Result<()> {
        if self.debug_logging {
            log_to_file(&self.log_file, message)?;
        }
        Ok(())
    }

    pub fn events(&self) -> &[BlinkEvent] {
        &self.events
    }

    pub fn prominence(&self) -> f64 {
        self.detector.prominence()
    }

    pub fn finish(self, ground_truth: &[GroundTruthBlink]) -> SessionReport {
        let metrics = self.scorer.score(ground_truth, &self.events);
        SessionReport {
            samples_processed: self.detector.samples_seen() - self.samples_skipped,
            samples_skipped: self.samples_skipped,
            final_prominence: self.detector.prominence(),
            retunes: self.retunes,
            metrics,
            events: self.events,
        }
    }
}

fn pace(fs: f64) {
    thread::sleep(Duration::from_secs_f64(1.0 / fs));
}

// -----------------------------------------------------------------------------
// RUNNERS
// -----------------------------------------------------------------------------

pub fn run_session<S: StreamSource>(stream: &mut S, config: &Config) -> Result<SessionReport> {
    run_session_until(stream, config, &AtomicBool::new(false))
}

/// Sequential loop that stops as soon as `cancel` is set; whatever was
/// detected up to that point is still scored.
pub fn run_session_until<S: StreamSource>(
    stream: &mut S,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<SessionReport> {
    let fs = stream.sampling_rate();
    let mut session = Session::new(config, fs)?;

    while !cancel.load(Ordering::Relaxed) {
        let Some(sample) = stream.next_sample() else {
            break;
        };
        let corrupt = stream.is_corrupt(sample.timestamp);
        session.feed(sample, corrupt)?;

        if config.processor.realtime {
            pace(fs);
        }
    }

    Ok(session.finish(stream.ground_truth_blinks()))
}

/// Reads the stream on its own thread and hands samples to the detection
/// worker over a bounded channel.
pub fn run_session_threaded<S: StreamSource + Send>(
    stream: &mut S,
    config: &Config,
) -> Result<SessionReport> {
    let fs = stream.sampling_rate();
    let realtime = config.processor.realtime;
    let mut session = Session::new(config, fs)?;
    let (tx, rx) = sync_channel::<(Sample, bool)>(config.processor.channel_capacity);
    let reader = &mut *stream;

    thread::scope(|scope| -> Result<()> {
        scope.spawn(move || {
            while let Some(sample) = reader.next_sample() {
                let corrupt = reader.is_corrupt(sample.timestamp);
                // Receiver gone: the worker stopped on an error
                if tx.send((sample, corrupt)).is_err() {
                    break;
                }
                if realtime {
                    pace(fs);
                }
            }
        });

        for (sample, corrupt) in rx {
            session.feed(sample, corrupt)?;
        }
        Ok(())
    })?;

    Ok(session.finish(stream.ground_truth_blinks()))
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub report: SessionReport,
}

/// Runs every data file in `folder` with its own detector, in parallel.
/// Reports come back in file-name order.
pub fn run_dataset<P: AsRef<Path>>(folder: P, config: &Config) -> Result<Vec<FileReport>> {
    let files = DatasetStream::discover(folder)?;

    files
        .par_iter()
        .map(|path| {
            let mut stream = DatasetStream::open(path, &config.stream)?;
            let report = run_session(&mut stream, config)?;
            Ok(FileReport {
                path: path.clone(),
                report,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::synthetic::{SyntheticConfig, SyntheticStream};
    use crate::stream::CorruptInterval;

    fn quiet_config() -> SyntheticConfig {
        SyntheticConfig {
            seed: 11,
            duration_s: 20.0,
            blink_count: 8,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn test_feed_returns_new_events_only() {
        let mut stream = SyntheticStream::new(&quiet_config());
        let mut session = Session::new(&Config::default(), stream.sampling_rate()).unwrap();

        let mut returned = Vec::new();
        while let Some(sample) = stream.next_sample() {
            returned.extend(session.feed(sample, false).unwrap());
        }
        assert_eq!(returned.as_slice(), session.events());
        assert_eq!(returned.len(), 8);
    }

    #[test]
    fn test_corrupt_samples_are_counted_not_processed() {
        let interval = CorruptInterval {
            start: 0.0,
            end: 20.0,
        };
        let mut stream = SyntheticStream::new(&quiet_config()).with_corrupt_interval(interval);
        let report = run_session(&mut stream, &Config::default()).unwrap();

        assert!(report.events.is_empty());
        assert_eq!(report.samples_skipped, 5000);
        assert_eq!(report.samples_processed, 0);
        assert_eq!(report.metrics.confusion.false_negatives, 8);
    }

    #[test]
    fn test_cancelled_session_is_empty_but_scored() {
        let mut stream = SyntheticStream::new(&quiet_config());
        let cancel = AtomicBool::new(true);
        let report = run_session_until(&mut stream, &Config::default(), &cancel).unwrap();
        assert_eq!(report.samples_processed, 0);
        assert_eq!(report.metrics.recall, 0.0);
    }

    #[test]
    fn test_tuning_history_stays_bounded() {
        let mut config = Config::default();
        config.correlation.enabled = true;
        config.correlation.batch_size = 4;
        let mut stream = SyntheticStream::new(&SyntheticConfig {
            seed: 3,
            duration_s: 60.0,
            blink_count: 20,
            ..SyntheticConfig::default()
        });
        let mut session = Session::new(&config, stream.sampling_rate()).unwrap();

        let mut seen = 0;
        while let Some(sample) = stream.next_sample() {
            session.feed(sample, false).unwrap();
            seen += 1;
            assert!(session.history.len() <= 2 * session.history_keep);
            assert_eq!(session.history_start + session.history.len(), seen);
        }
        assert!(session.history_start > 0);
        // Segments taken before a drain still reach the tuner
        assert_eq!(session.retunes, 5);
    }

    #[test]
    fn test_invalid_sampling_rate_is_rejected() {
        assert!(Session::new(&Config::default(), 0.0).is_err());
    }

    #[test]
    fn test_run_dataset_reports_in_name_order() {
        let root = std::env::temp_dir().join(format!("eyeblink-session-{}", std::process::id()));
        let folder = root.join("EEG-IO");
        std::fs::create_dir_all(&folder).unwrap();

        for name in ["S02", "S01"] {
            let mut data = String::from("Time;Fp1;Fp2\n");
            for i in 0..500 {
                data.push_str(&format!("{};0;0\n", i as f64 / 250.0));
            }
            std::fs::write(folder.join(format!("{}_data.csv", name)), data).unwrap();
            let labels = "corrupt,0\nblinks\n1.0,0\n";
            std::fs::write(folder.join(format!("{}_labels.csv", name)), labels).unwrap();
        }

        let reports = run_dataset(&folder, &Config::default()).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let names: Vec<String> = reports
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["S01_data.csv", "S02_data.csv"]);
        for file in &reports {
            assert!(file.report.events.is_empty());
            assert_eq!(file.report.samples_processed, 500);
            assert_eq!(file.report.metrics.confusion.false_negatives, 1);
        }
    }
}
