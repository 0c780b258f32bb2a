//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": "..."}` with a status that
//! says whose fault it was: 400 for anything the caller can fix, 500 for
//! inference and model problems.

use abode_data::DataError;
use abode_model::{ModelLoadError, PredictionError};
use abode_output::ExportError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Result type for handlers.
pub(crate) type Result<T> = std::result::Result<T, ServerError>;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub(crate) enum ServerError {
    /// Malformed or empty request
    #[error("{0}")]
    BadRequest(String),

    /// No model has loaded successfully
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// Validation or inference failure
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// Uploaded CSV could not be read
    #[error("Invalid CSV: {0}")]
    Csv(#[from] DataError),

    /// Reload from disk failed
    #[error("Reload failed: {0}")]
    Reload(#[from] ModelLoadError),

    /// Result serialization failed
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Blocking task panicked or was cancelled
    #[error("Internal server error")]
    Internal,

    /// No such route
    #[error("Endpoint not found")]
    NotFound,
}

impl ServerError {
    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Csv(_) => StatusCode::BAD_REQUEST,
            Self::Prediction(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ModelNotLoaded
            | Self::Prediction(_)
            | Self::Reload(_)
            | Self::Export(_)
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "blocking task failed");
        Self::Internal
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abode_model::{InferenceError, MissingFeatureError};

    #[test]
    fn test_status_mapping() {
        let missing = PredictionError::MissingFeatures(MissingFeatureError {
            missing: vec!["beds".to_string()],
            row: None,
        });
        assert_eq!(ServerError::from(missing).status(), StatusCode::BAD_REQUEST);

        let inference = PredictionError::Inference(InferenceError::NonFinite { row: 0 });
        assert_eq!(
            ServerError::from(inference).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        assert_eq!(ServerError::ModelNotLoaded.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ServerError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::BadRequest("Request must be JSON".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_features_message() {
        let err = ServerError::from(PredictionError::MissingFeatures(MissingFeatureError {
            missing: vec!["beds".to_string(), "bath".to_string()],
            row: None,
        }));
        assert_eq!(err.to_string(), "Missing required features: beds, bath");
    }
}
