//! Error types for the model lifecycle core and API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the model lifecycle core
///
/// Every failure is terminal for the current request; nothing here is
/// retried internally.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The requested name is absent from the registry
    #[error("model '{0}' is not registered")]
    Unregistered(String),

    /// The record's type tag resolves to no load strategy
    #[error("unsupported model type: {0}")]
    UnsupportedKind(String),

    /// I/O or deserialization failure while loading model artifacts
    #[error("failed to load model from {path:?}: {source}")]
    Load { path: PathBuf, source: anyhow::Error },

    /// Failure while producing output from a loaded model
    #[error("generation failed: {0}")]
    Generation(String),

    /// Training input is neither an existing file path nor a usable record list
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// The external trainer process failed, timed out, or could not be spawned
    #[error("fine-tune failed: {0}")]
    Training(String),
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unregistered(_) => ApiError::NotFound(err.to_string()),
            ModelError::InvalidDataset(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}
