//! HTTP error responses.
//!
//! Every failure leaves the service as a JSON body
//! `{"code": "...", "message": "...", "details": {...}}` with the status
//! implied by its [`ErrorCode`]. Resolution errors keep the upstream message
//! verbatim and carry the upstream status in `details.upstream_status`.

use aside_core::{AsideError, ConfigError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Body is not valid JSON or does not match the request shape.
    InvalidInput,
    /// A required field is present but empty.
    MissingField,
    /// A path or body value is outside its accepted set.
    InvalidFormat,
    /// The producer failed.
    UpstreamError,
    /// A cache commit or delete failed where the caller must be told.
    StoreError,
    InternalError,
    /// The backing store cannot be reached.
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::MissingField | Self::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            Self::UpstreamError | Self::StoreError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error returned by every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// `field` was supplied but empty.
    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("'{}' must not be empty", field))
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("'{}' must be {}", field, expected),
        )
    }

    /// Producer failure. The message is passed through untouched.
    pub fn upstream(message: impl Into<String>, status: Option<u16>) -> Self {
        let error = Self::new(ErrorCode::UpstreamError, message);
        match status {
            Some(status) => error.with_details(json!({ "upstream_status": status })),
            None => error,
        }
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Upstream status recorded in `details`, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        self.details
            .as_ref()
            .and_then(|d| d.get("upstream_status"))
            .and_then(|s| s.as_u64())
            .and_then(|s| u16::try_from(s).ok())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<AsideError> for ApiError {
    fn from(err: AsideError) -> Self {
        match err {
            AsideError::Upstream(e) => ApiError::upstream(e.message, e.status),
            AsideError::Store(e) => e.into(),
            AsideError::Codec(e) => ApiError::internal_error(e.to_string()),
            AsideError::Config(e) => e.into(),
        }
    }
}

/// Only reachable under the durable write policy or from administrative
/// routes; lookups never fail a request.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { reason } => ApiError::service_unavailable(reason),
            other => ApiError::store_error(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(format!("Configuration error: {}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!(error = %err, "Rejected request body");
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
