//! Error types for aside operations

use thiserror::Error;

/// Cache store errors.
///
/// `NotFound` and `Unavailable` are absorbed by the resolver and never reach
/// the caller; `CommitFailed` only surfaces under the durable write policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cache entry not found")]
    NotFound,

    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache commit failed: {reason}")]
    CommitFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn commit_failed(reason: impl Into<String>) -> Self {
        Self::CommitFailed {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Failure reported by a producer.
///
/// `status` carries the upstream HTTP status when there was one; transport
/// and construction failures have none.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    /// Upstream answered with a non-success status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Request could not be built or the transport failed.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// The producer did not finish before the resolution deadline.
    pub fn timed_out(after: std::time::Duration) -> Self {
        Self::transport(format!("producer timed out after {}ms", after.as_millis()))
    }
}

/// Codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Encode failed: {reason}")]
    Encode { reason: String },

    #[error("Decode failed: {reason}")]
    Decode { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for resolution.
#[derive(Debug, Clone, Error)]
pub enum AsideError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AsideError {
    /// Upstream status, if this error came from a producer that reported one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream(e) => e.status,
            _ => None,
        }
    }
}

/// Result type alias for aside operations.
pub type AsideResult<T> = Result<T, AsideError>;
