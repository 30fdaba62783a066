//! Error types for the response-generation core.

use thiserror::Error;

/// Errors raised while building or querying detector response models.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Query against a detector identity that is not registered.
    #[error("Unknown detector: {0}")]
    UnknownDetector(String),

    /// Calibration data failed validation (bad bin edges, missing file).
    #[error("Calibration error for {detector}: {reason}")]
    Calibration { detector: String, reason: String },

    /// Pointing history failed validation (empty, unsorted MET).
    #[error("Pointing history error: {0}")]
    Pointing(String),

    /// Underlying file I/O failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A calibration or pointing file could not be parsed.
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ResponseError {
    /// Creates an unknown-detector error.
    pub fn unknown(detector: impl std::fmt::Display) -> Self {
        Self::UnknownDetector(detector.to_string())
    }

    /// Creates a calibration error.
    pub fn calibration(detector: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Calibration {
            detector: detector.to_string(),
            reason: reason.into(),
        }
    }
}
