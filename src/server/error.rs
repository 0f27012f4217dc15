//! Mapping of core errors onto HTTP responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::ScanError;

use super::types::ErrorResponse;

/// Error returned by handlers
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed to decode
    BadRequest(&'static str),
    NotFound(&'static str),
    /// Fixed message shown to the client; the cause is only logged
    Unavailable(&'static str, ScanError),
    Core(ScanError),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string()),
            Self::Unavailable(message, err) => {
                error!(error = %err, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            // Validation failures surface as 500 as well
            Self::Core(err) => {
                error!(error = %err, persistence = err.is_persistence(), "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
