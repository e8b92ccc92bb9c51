// API error type and its HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::GranularityParseError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Granularity(#[from] GranularityParseError),

    /// Widget task gone or store failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Granularity(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_GRANULARITY"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        if status.is_server_error() {
            tracing::error!(error_code = code, error = %self, "API error");
        } else {
            tracing::debug!(error_code = code, error = %self, "API request rejected");
        }
        let body = serde_json::json!({
            "error": { "code": code, "message": self.to_string() }
        });
        (status, Json(body)).into_response()
    }
}
