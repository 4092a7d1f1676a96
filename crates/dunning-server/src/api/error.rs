//! API error type and helpers.
//!
//! Every failure leaves the server as `{success: false, error, code}`
//! with a status derived from the error category. Internal errors are
//! logged server-side; their detail only reaches the client when
//! [`set_expose_internal_details`] was switched on (development).

use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use dunning_core::error::DunningError;
use serde::Serialize;

static EXPOSE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Echo the cause of 5xx errors in response bodies.
pub fn set_expose_internal_details(expose: bool) {
    EXPOSE_INTERNAL_DETAILS.store(expose, Ordering::Relaxed);
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                success: false,
                error: message.into(),
                code,
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.body.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_not_found(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

pub fn api_validation_error(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

pub fn api_unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

pub fn api_forbidden(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
}

pub fn api_conflict(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, "CONFLICT", message)
}

/// Build a 500 error. The cause is logged, and echoed only when
/// internal details are exposed.
pub fn api_internal(cause: &DunningError) -> ApiError {
    tracing::error!(error = %cause, "Request failed with an internal error");
    let err = ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_SERVER_ERROR",
        "internal server error",
    );
    if EXPOSE_INTERNAL_DETAILS.load(Ordering::Relaxed) {
        err.with_details(serde_json::Value::String(cause.to_string()))
    } else {
        err
    }
}

impl From<DunningError> for ApiError {
    fn from(err: DunningError) -> Self {
        match err {
            DunningError::NotFound { .. } => api_not_found(err.to_string()),
            DunningError::AlreadyExists { .. } => api_conflict(err.to_string()),
            DunningError::AuthenticationFailed { reason } => api_unauthorized(reason),
            DunningError::AuthorizationDenied { reason } => api_forbidden(reason),
            DunningError::Validation { message } => api_validation_error(message),
            DunningError::Database(_) | DunningError::Crypto(_) | DunningError::Internal(_) => {
                api_internal(&err)
            }
        }
    }
}
