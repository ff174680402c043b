//! Error types for postbox-sync.

use postbox_core::PostId;
use thiserror::Error;

/// Rejected staging operations. Staging is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("no post with id {0}")]
    UnknownPost(PostId),

    /// Adds and deletes are locked while a reorder is staged.
    #[error("a reorder is staged; publish or cancel it first")]
    ReorderActive,

    /// Reordering is locked while adds or deletes are staged.
    #[error("adds or deletes are staged; publish or discard them before reordering")]
    EditsPending,

    #[error("post {0} appears more than once in the new order")]
    DuplicateInOrder(PostId),
}

/// A failed publish. Staging is left exactly as it was before the attempt.
///
/// Carries only human-readable reasons; transport details stay in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("could not fetch the latest posts: {0}")]
    Fetch(String),

    #[error("gave up after {attempts} conflicting writes; changes are still staged")]
    ConflictRetriesExhausted { attempts: u32 },

    /// The store refused the token. The session should be closed.
    #[error("the store rejected the access token: {0}")]
    Unauthorized(String),

    #[error("publish failed: {0}")]
    Write(String),
}
