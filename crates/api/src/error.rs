//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationError;
use ordering::OrderingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid caller identity.
    Unauthorized(String),
    /// Request body or query could not be decoded.
    BadRequest(String),
    /// Order placement or listing failed.
    Ordering(OrderingError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            ApiError::Ordering(err) => {
                let status = match err {
                    OrderingError::Validation(_) => StatusCode::BAD_REQUEST,
                    OrderingError::InsufficientStock { .. } => StatusCode::CONFLICT,
                    OrderingError::PersistenceFailure(_) | OrderingError::Internal(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    OrderingError::Storage(_) | OrderingError::Timeout(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                };
                (status, err.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Ordering(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, kind, "request failed");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderingError> for ApiError {
    fn from(err: OrderingError) -> Self {
        ApiError::Ordering(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Ordering(OrderingError::Validation(err))
    }
}
