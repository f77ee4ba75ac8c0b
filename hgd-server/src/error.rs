//! Error types for hgd-server
//!
//! Every handler error becomes `{"error": {"code", "message"}}`. Server-side
//! failures (5xx) carry a generic message; the cause is logged instead.

use crate::assets::AssetError;
use crate::store::StoreError;
use crate::workflow::IngestionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409) - record already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Address could not be geocoded (400)
    #[error("Geocoding failed: {0}")]
    GeocodeFailed(String),

    /// Geocoder unreachable or misbehaving (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Store read/write failure (500)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("contact {}", id)),
            StoreError::Duplicate(id) => ApiError::Conflict(format!("record already exists: {}", id)),
            StoreError::InvalidKey(key) => ApiError::BadRequest(format!("invalid identifier: {:?}", key)),
            StoreError::InvalidRecord(msg) => ApiError::BadRequest(msg),
            StoreError::Serialize(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Persistence(other.to_string()),
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Validation(msg) => ApiError::BadRequest(msg),
            IngestionError::GeocodeFailed(e) if e.is_client_fault() => {
                ApiError::GeocodeFailed(e.to_string())
            }
            IngestionError::GeocodeFailed(e) => ApiError::Upstream(e.to_string()),
            IngestionError::Duplicate(id) => {
                ApiError::Conflict(format!("location already exists: {}", id))
            }
            IngestionError::Persistence(e) => ApiError::Persistence(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::GeocodeFailed(msg) => (StatusCode::BAD_REQUEST, "GEOCODE_FAILED", msg),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "Geocoding service unavailable".to_string(),
                )
            }
            ApiError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "Failed to persist data".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
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
