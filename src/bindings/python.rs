use crate::config::{load_config, Config};
use crate::local::session::{Session, SessionReport};
use crate::processing::emitter::{BlinkEvent, BlinkType};
use crate::processing::scoring::{AccuracyScorer, Metrics};
use crate::stream::{GroundTruthBlink, Sample};

use std::collections::HashMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(err: crate::error::BlinkError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn ground_truth(timestamps: Vec<f64>) -> Vec<GroundTruthBlink> {
    timestamps
        .into_iter()
        .map(|timestamp| GroundTruthBlink {
            timestamp,
            label: BlinkType::Normal.label(),
        })
        .collect()
}

fn metrics_map(metrics: &Metrics) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("Accuracy".to_string(), metrics.accuracy);
    map.insert("Precision".to_string(), metrics.precision);
    map.insert("Recall".to_string(), metrics.recall);
    map.insert("F1 Score".to_string(), metrics.f1_score);
    map.insert("TP".to_string(), metrics.confusion.true_positives as f64);
    map.insert("FP".to_string(), metrics.confusion.false_positives as f64);
    map.insert("FN".to_string(), metrics.confusion.false_negatives as f64);
    map
}

#[pyclass]
pub struct PyBlinkDetector {
    session: Option<Session>,
}

impl PyBlinkDetector {
    fn session(&mut self) -> PyResult<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| PyValueError::new_err("detector already finished"))
    }
}

#[pymethods]
impl PyBlinkDetector {
    /// Builds a detector from a YAML config file, or the defaults when no
    /// path is given.
    #[new]
    #[pyo3(signature = (fs, config_path=None))]
    pub fn new(fs: f64, config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => load_config(path).map_err(to_py_err)?,
            None => Config::default(),
        };
        let session = Session::new(&config, fs).map_err(to_py_err)?;
        Ok(PyBlinkDetector {
            session: Some(session),
        })
    }

    /// Returns the timestamps of any blinks emitted by this sample.
    #[pyo3(signature = (timestamp, channel_a, channel_b, corrupt=false))]
    pub fn process(
        &mut self,
        timestamp: f64,
        channel_a: f64,
        channel_b: f64,
        corrupt: bool,
    ) -> PyResult<Vec<f64>> {
        let events = self
            .session()?
            .feed(Sample::new(timestamp, channel_a, channel_b), corrupt)
            .map_err(to_py_err)?;
        Ok(events.iter().map(|event| event.timestamp).collect())
    }

    pub fn run_chunk(
        &mut self,
        timestamps: Vec<f64>,
        channel_a: Vec<f64>,
        channel_b: Vec<f64>,
    ) -> PyResult<Vec<f64>> {
        let session = self.session()?;
        let mut detected = Vec::new();
        for ((t, a), b) in timestamps.into_iter().zip(channel_a).zip(channel_b) {
            let events = session.feed(Sample::new(t, a, b), false).map_err(to_py_err)?;
            detected.extend(events.iter().map(|event| event.timestamp));
        }
        Ok(detected)
    }

    pub fn prominence(&mut self) -> PyResult<f64> {
        Ok(self.session()?.prominence())
    }

    /// Scores everything detected so far and closes the detector.
    pub fn finish(&mut self, ground_truth_timestamps: Vec<f64>) -> PyResult<HashMap<String, f64>> {
        let session = self
            .session
            .take()
            .ok_or_else(|| PyValueError::new_err("detector already finished"))?;
        let report: SessionReport = session.finish(&ground_truth(ground_truth_timestamps));
        Ok(metrics_map(&report.metrics))
    }
}

/// Scores detection timestamps against ground-truth timestamps.
#[pyfunction]
#[pyo3(signature = (ground_truth_timestamps, detected_timestamps, tolerance=0.5, min_time=0.5))]
pub fn get_metrics(
    ground_truth_timestamps: Vec<f64>,
    detected_timestamps: Vec<f64>,
    tolerance: f64,
    min_time: f64,
) -> HashMap<String, f64> {
    let detections: Vec<BlinkEvent> = detected_timestamps
        .into_iter()
        .map(|t| BlinkEvent::new(t, BlinkType::Normal, 1.0))
        .collect();
    let ground_truth = ground_truth(ground_truth_timestamps);
    let metrics = AccuracyScorer::new(tolerance, min_time).score(&ground_truth, &detections);
    metrics_map(&metrics)
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn eyeblink(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBlinkDetector>()?;
    m.add_function(wrap_pyfunction!(get_metrics, m)?)?;
    Ok(())
}
