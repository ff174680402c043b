//! Error types for postbox-session.

use postbox_sync::{PublishError, StagingError};
use thiserror::Error;

/// Why a login was refused. Each variant points at the input to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("username or password is incorrect")]
    BadCredentials,

    #[error("the access token is invalid or expired")]
    InvalidToken,

    #[error("token for {login} has no write access to the repository")]
    NoWriteAccess { login: String },

    /// The store could not be asked (network, server error).
    #[error("could not check the access token: {0}")]
    TokenCheckFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("log in first")]
    LoggedOut,

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
