//! Error types for loading, training and inference.
//!
//! The taxonomy follows what the caller can do about a failure:
//!
//! - [`MissingFeatureError`]: the request is incomplete; the caller resubmits.
//! - [`InferenceError`]: the model call itself failed. Not retried, since the
//!   same input against the same artifact fails the same way.
//! - [`ModelLoadError`]: the artifact is missing or unreadable; the process
//!   stops serving predictions but can still report its status.

use abode_data::DataError;
use abode_encoding::EncodingError;
use polars::prelude::PolarsError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One or more required features are absent from a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFeatureError {
    /// Every missing feature, in expected order
    pub missing: Vec<String>,
    /// Row index within a batch, if the record came from one
    pub row: Option<usize>,
}

impl fmt::Display for MissingFeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing required features: {}", self.missing.join(", "))?;
        if let Some(row) = self.row {
            write!(f, " (row {row})")?;
        }
        Ok(())
    }
}

impl std::error::Error for MissingFeatureError {}

/// The underlying model call failed
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Input could not be encoded (bad type, null, unknown column)
    #[error("Feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Input table could not be built
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Encoded width differs from what the model was trained on
    #[error("Shape mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch {
        /// Trained feature count
        expected: usize,
        /// Supplied feature count
        actual: usize,
    },

    /// Model returned the wrong number of outputs
    #[error("Model returned {actual} predictions for {expected} rows")]
    RowCountMismatch {
        /// Input rows
        expected: usize,
        /// Outputs received
        actual: usize,
    },

    /// Model produced NaN or infinity
    #[error("Model produced a non-finite prediction at row {row}")]
    NonFinite {
        /// Offending row
        row: usize,
    },
}

/// Prediction failure surfaced to callers
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Incomplete record
    #[error(transparent)]
    MissingFeatures(#[from] MissingFeatureError),

    /// Model call failed
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    /// Whether the caller can fix this by changing the input.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingFeatures(_))
    }
}

/// The model or metadata artifact could not be loaded
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid JSON for the expected shape
    #[error("Failed to parse {what}: {source}")]
    Parse {
        /// Which artifact
        what: &'static str,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Metadata carries a schema version this build does not know
    #[error("Unsupported metadata schema version {found} (expected {expected})")]
    UnsupportedSchema {
        /// Version in the file
        found: u64,
        /// Version this build reads
        expected: u32,
    },

    /// Metadata is in the pre-versioned layout
    #[error("Metadata uses the legacy layout; convert it with `abode migrate-metadata`")]
    LegacySchema,

    /// Metadata has no recognizable layout
    #[error("Unrecognized metadata layout: {0}")]
    UnrecognizedLayout(String),

    /// Model artifact carries an unknown format version
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Metadata and model disagree about the inputs
    #[error("Model and metadata disagree: {0}")]
    FeatureMismatch(String),
}

/// Training failure
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Dataset error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Encoder fitting error
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Evaluation inference error
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Too few rows for the requested procedure
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Required rows
        required: usize,
        /// Available rows
        actual: usize,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing artifacts failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing artifacts failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_message_names_every_field() {
        let err = MissingFeatureError {
            missing: vec!["beds".to_string(), "bath".to_string()],
            row: None,
        };
        assert_eq!(err.to_string(), "Missing required features: beds, bath");

        let err = MissingFeatureError {
            row: Some(3),
            ..err
        };
        assert!(err.to_string().ends_with("(row 3)"));
    }

    #[test]
    fn test_client_error_classification() {
        let missing: PredictionError = MissingFeatureError {
            missing: vec!["type".to_string()],
            row: None,
        }
        .into();
        assert!(missing.is_client_error());

        let inference: PredictionError = InferenceError::NonFinite { row: 0 }.into();
        assert!(!inference.is_client_error());
    }
}
