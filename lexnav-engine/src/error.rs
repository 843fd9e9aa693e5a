//! Error types for lexnav-engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Traversal engine errors that abort a run and surface to the caller.
///
/// Oracle and reconciliation failures never appear here: they are contained
/// inside the run as fallback decisions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Raw input could not be normalised into a document tree
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Structural invariant violated after normalisation
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// Run cancelled between levels or between chunks
    #[error("Traversal cancelled")]
    Cancelled,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Raw document rejected by the normaliser (400)
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Normalised tree rejected by the validator (422)
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// Run cancelled before completion (409)
    #[error("Traversal cancelled")]
    Cancelled,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// lexnav-common error
    #[error("Common error: {0}")]
    Common(#[from] lexnav_common::Error),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::MalformedDocument(msg) => ApiError::MalformedDocument(msg),
            EngineError::InvalidTree(msg) => ApiError::InvalidTree(msg),
            EngineError::Cancelled => ApiError::Cancelled,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::MalformedDocument(msg) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_DOCUMENT", msg)
            }
            ApiError::InvalidTree(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TREE", msg)
            }
            ApiError::Cancelled => (
                StatusCode::CONFLICT,
                "CANCELLED",
                "Traversal run was cancelled".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_maps_to_api_error() {
        let api: ApiError = EngineError::MalformedDocument("no shape matched".to_string()).into();
        assert!(matches!(api, ApiError::MalformedDocument(_)));

        let api: ApiError = EngineError::InvalidTree("dangling child".to_string()).into();
        assert!(matches!(api, ApiError::InvalidTree(_)));

        let api: ApiError = EngineError::Cancelled.into();
        assert!(matches!(api, ApiError::Cancelled));
    }
}
