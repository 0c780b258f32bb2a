//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or preparing the dataset.
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Required column absent from the header
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// No usable rows remained
    #[error("Dataset is empty after {stage}")]
    Empty {
        /// Processing stage that emptied the dataset
        stage: &'static str,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Invalid split or cleaning parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
