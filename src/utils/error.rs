//! Error Handling Module
//!
//! Fatal startup failures (`CheckpointError`) and per-request failures
//! (`PredictionError`) are separate types so that callers cannot fold a
//! missing checkpoint and a single bad upload into the same branch.
//! `Error` wraps both for the CLI and the evaluation engine.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading a checkpoint. Always fatal at startup.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// No file at the configured path
    #[error("Checkpoint not found: {0}")]
    NotFound(PathBuf),

    /// The file exists but is unreadable, incomplete or inconsistent
    #[error("Checkpoint '{path}' is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl CheckpointError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CheckpointError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failures for a single image. Recoverable: reject the input, keep serving.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// File name does not carry a supported image extension
    #[error("Unsupported file type '{0}': expected a JPG, JPEG or PNG image")]
    UnsupportedFileType(String),

    /// Bytes could not be decoded or coerced to RGB
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Tensor does not fit the model. Indicates a preprocessing bug.
    #[error("Inference error: {0}")]
    Inference(String),
}

impl From<image::ImageError> for PredictionError {
    fn from(err: image::ImageError) -> Self {
        PredictionError::InvalidImage(err.to_string())
    }
}

/// Main error type for CropGuard operations
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// Evaluation directory missing or not a directory
    #[error("Test directory not found: {0}")]
    DatasetNotFound(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Convenience Result type for CropGuard operations
pub type Result<T> = std::result::Result<T, Error>;
