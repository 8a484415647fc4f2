pub mod blink_detector;
pub mod correlation;
pub mod detectors;
pub mod emitter;
pub mod filters;
pub mod scoring;
