//! Error types for column encoding.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;

/// Errors that can occur while fitting or applying an encoder.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// `transform` was called before `fit`
    #[error("{encoder} has not been fitted")]
    NotFitted {
        /// Name of the encoder
        encoder: &'static str,
    },

    /// A column the encoder was fitted on is absent from the input
    #[error("Column not found in input: {0}")]
    MissingColumn(String),

    /// A numeric column contains a null value
    #[error("Null value in numeric column '{column}' at row {row}")]
    NullValue {
        /// Column name
        column: String,
        /// Row index
        row: usize,
    },

    /// Polars error (typically a failed cast)
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Matrix assembly error
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
