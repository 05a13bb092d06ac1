//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use backchannel_hub::HubError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested target is not connected.
    #[error("not found: {0}")]
    NotFound(String),

    /// The hub is at its concurrent-request limit.
    #[error("service busy")]
    ServiceBusy,

    /// The call ran out of time waiting for a reply.
    #[error("request timed out")]
    GatewayTimeout,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceBusy => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::ServiceBusy => "service_busy",
            Self::GatewayTimeout => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Overloaded => Self::ServiceBusy,
            HubError::NoTarget => Self::NotFound("no connected target".to_string()),
            HubError::InactiveConnection(id) => Self::NotFound(format!("connection {id}")),
            HubError::Timeout => Self::GatewayTimeout,
            HubError::Cancelled => Self::Internal("request cancelled".to_string()),
            HubError::Client(message) => {
                // Raw invokes return error envelopes in-band; a client
                // error arriving here means a typed decode path failed.
                Self::Internal(format!("client error: {message}"))
            }
            HubError::BlobMissing(_)
            | HubError::Decode(_)
            | HubError::RequestIdCollision(_)
            | HubError::Store(_)
            | HubError::Blob(_) => {
                tracing::error!(error = %err, "Hub error");
                Self::Internal("hub error".to_string())
            }
        }
    }
}
