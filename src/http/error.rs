//! Mapping from [`ServiceError`] onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel_async::pooled_connection::bb8::RunError;
use serde_json::json;
use tracing::{error, warn};

use crate::error::ServiceError;

/// A service failure on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

/// Result type returned by handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self { Self(err) }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self { Self(ServiceError::Pool(err)) }
}

/// Status code reported for each error kind.
#[must_use]
pub fn status_of(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_)
        | ServiceError::InsufficientBalance
        | ServiceError::Unavailable
        | ServiceError::OutOfStock => StatusCode::BAD_REQUEST,
        ServiceError::Unauthenticated | ServiceError::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Database(_) | ServiceError::Pool(_) | ServiceError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "internal server error".to_owned()
        } else {
            if status == StatusCode::FORBIDDEN {
                warn!(reason = %self.0, "request forbidden");
            }
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
