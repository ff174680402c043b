//! Error types for postbox-store.

use thiserror::Error;

/// All errors that can arise from talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network failure, timeout, TLS error and friends.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The write's version precondition did not hold. Retryable.
    #[error("version conflict writing {path}")]
    Conflict { path: String },

    /// The token was rejected or lacks access to the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A write was attempted without an access token.
    #[error("an access token is required to write")]
    MissingToken,

    /// Any other non-success status.
    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    /// The response arrived but could not be understood.
    #[error("malformed response for {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// JSON encoding of an outgoing document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// `true` for the one outcome that should trigger re-fetch and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_) | StoreError::MissingToken)
    }
}

pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Malformed {
        path: path.to_string(),
        reason: reason.into(),
    }
}
