pub mod bindings;
pub mod config;
pub mod error;
pub mod local;
pub mod processing;
pub mod stream;
pub mod utils;

pub use config::{load_config, save_config, Config};
pub use error::{BlinkError, Result};
pub use local::session::{
    run_dataset, run_session, run_session_threaded, run_session_until, FileReport, Session,
    SessionReport,
};
pub use processing::blink_detector::{BlinkDetector, Detection};
pub use processing::emitter::{BlinkEvent, BlinkType};
pub use processing::filters::lowpass::lowpass;
pub use processing::scoring::{AccuracyScorer, Metrics};
pub use stream::{CorruptInterval, GroundTruthBlink, Sample, StreamSource};
