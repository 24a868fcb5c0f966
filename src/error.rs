//! Error type shared by every processing stage.
//!
//! Only unrecoverable conditions are errors. A degenerate segmentation is
//! reported through an empty [`crate::features::FeatureSet`] and a metric
//! computed on empty input evaluates to `NaN`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GazeError {
    #[error("required channel '{channel}' not found in header of {source_name}")]
    MissingChannel {
        channel: &'static str,
        source_name: String,
    },

    #[error("format error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("operation cancelled by progress callback")]
    Cancelled,

    #[error("image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GazeError>;
