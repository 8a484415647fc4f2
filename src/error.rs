use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlinkError {
    #[error("dataset folder not found at: {0}")]
    DatasetFolderNotFound(PathBuf),

    #[error("specified file not found: {0}")]
    DataFileNotFound(PathBuf),

    #[error("no data files found in {0}")]
    NoDataFiles(PathBuf),

    #[error("error in parsing label file {path}: {reason}")]
    MalformedLabels { path: PathBuf, reason: String },

    #[error("malformed sample in {path} at row {row}: {reason}")]
    MalformedData {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("segment {index} ({start}..{end}) lies outside a signal of {len} samples")]
    SegmentOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("segments {first} and {second} differ in length ({first_len} vs {second_len})")]
    SegmentLengthMismatch {
        first: usize,
        second: usize,
        first_len: usize,
        second_len: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BlinkError>;
