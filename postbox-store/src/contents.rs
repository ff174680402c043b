//! The transport seam between the document logic and a concrete store.

use std::fmt;

use postbox_core::VersionToken;

use crate::error::StoreError;

/// Bearer token for the remote store.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// A file as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub version: VersionToken,
    pub content: Vec<u8>,
}

/// A conditional write.
///
/// `expected` is the token of the revision being replaced, or `None` to
/// create. The store rejects the write with [`StoreError::Conflict`] if it
/// does not match the current revision.
#[derive(Debug, Clone, Copy)]
pub struct FileWrite<'a> {
    pub message: &'a str,
    pub content: &'a [u8],
    pub expected: Option<&'a VersionToken>,
}

/// The account a token authenticates as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub login: String,
}

/// What a token may do on the configured repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepositoryAccess {
    pub push: bool,
}

/// A versioned file store addressed by path.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Read a file. `Ok(None)` when it does not exist.
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError>;

    /// Replace (or create) a file under the version precondition in `write`.
    /// Returns the token of the new revision.
    async fn write_file(&self, path: &str, write: FileWrite<'_>)
        -> Result<VersionToken, StoreError>;

    /// Durable public URL a reader can fetch `path` from.
    fn public_url(&self, path: &str) -> String;

    /// Resolve the account behind `token`.
    async fn identity(&self, token: &AccessToken) -> Result<Identity, StoreError>;

    /// Permissions `token` holds on the configured repository.
    async fn repository_access(&self, token: &AccessToken)
        -> Result<RepositoryAccess, StoreError>;

    /// A handle that sends `token` with every request.
    fn authorized(&self, token: AccessToken) -> Self
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::from("ghp_secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.expose(), "ghp_secret");
    }
}
