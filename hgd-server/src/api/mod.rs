//! HTTP API handlers for hgd-server

pub mod contacts;
pub mod health;
pub mod locations;

pub use contacts::contact_routes;
pub use health::health_routes;
pub use locations::location_routes;

use crate::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, reporting malformed input in the API error format
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `{"success": true, "message": ...}`
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
