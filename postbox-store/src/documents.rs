//! The posts document on top of a [`ContentStore`].
//!
//! ## `write_snapshot` — version check protocol
//!
//! 1. Re-read the document's current token (the caller's may be stale).
//! 2. Compare it with the token the caller merged against → conflict if different.
//! 3. Serialize the posts pretty-printed (human-diffable history).
//! 4. Conditional write under the current token.
//! 5. Remember the new token as a warm, advisory starting point.
//!
//! A conflict at step 2 or 4 leaves the remote untouched; the caller is
//! expected to re-fetch, re-merge and try again.

use chrono::Utc;
use postbox_core::{Post, RepoConfig, Snapshot, VersionToken};

use crate::contents::{ContentStore, FileWrite};
use crate::error::{malformed, StoreError};

pub struct RemoteDocuments<S> {
    store: S,
    repo: RepoConfig,
    cached_version: Option<VersionToken>,
}

impl<S: ContentStore> RemoteDocuments<S> {
    pub fn new(store: S, repo: RepoConfig) -> Self {
        Self {
            store,
            repo,
            cached_version: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn repo(&self) -> &RepoConfig {
        &self.repo
    }

    /// Token seen on the last successful fetch or write. Advisory only.
    pub fn cached_version(&self) -> Option<&VersionToken> {
        self.cached_version.as_ref()
    }

    /// Read the posts document. A missing document is an empty snapshot.
    pub async fn fetch_snapshot(&mut self) -> Result<Snapshot, StoreError> {
        let path = self.repo.posts_path.clone();
        let Some(file) = self.store.read_file(&path).await? else {
            tracing::info!(path = %path, "posts document not found, starting empty");
            self.cached_version = None;
            return Ok(Snapshot::empty());
        };

        let posts: Vec<Post> = serde_json::from_slice(&file.content)
            .map_err(|e| malformed(&path, format!("posts document is not a post array: {e}")))?;
        tracing::debug!(path = %path, posts = posts.len(), version = %file.version, "fetched snapshot");
        self.cached_version = Some(file.version.clone());
        Ok(Snapshot {
            posts,
            version: Some(file.version),
        })
    }

    /// Replace the posts document, provided it is still at `expected`.
    pub async fn write_snapshot(
        &mut self,
        posts: &[Post],
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        let path = self.repo.posts_path.clone();

        let current = self.store.read_file(&path).await?.map(|f| f.version);
        if self.cached_version.is_some() && self.cached_version != current {
            tracing::debug!(path = %path, "cached version token was stale");
        }
        if current.as_ref() != expected {
            tracing::warn!(
                path = %path,
                expected = ?expected.map(|v| v.0.as_str()),
                current = ?current.as_ref().map(|v| v.0.as_str()),
                "document changed since it was read",
            );
            self.cached_version = current;
            return Err(StoreError::Conflict { path });
        }

        let body = serde_json::to_string_pretty(posts)?;
        let message = format!("Update blog posts — {}", Utc::now().to_rfc3339());
        let version = self
            .store
            .write_file(
                &path,
                FileWrite {
                    message: &message,
                    content: body.as_bytes(),
                    expected: current.as_ref(),
                },
            )
            .await?;

        tracing::info!(path = %path, posts = posts.len(), version = %version, "wrote snapshot");
        self.cached_version = Some(version.clone());
        Ok(version)
    }

    /// Upload a binary asset under the assets prefix and return its public URL.
    ///
    /// Idempotent by path: an existing file is replaced under its own token
    /// instead of failing as a conflicting create.
    pub async fn upload_asset(&self, bytes: &[u8], filename: &str) -> Result<String, StoreError> {
        let path = self.repo.asset_path(filename);
        let existing = self.store.read_file(&path).await?.map(|f| f.version);
        let message = format!("Add blog image: {filename}");
        self.store
            .write_file(
                &path,
                FileWrite {
                    message: &message,
                    content: bytes,
                    expected: existing.as_ref(),
                },
            )
            .await?;
        let url = self.store.public_url(&path);
        tracing::info!(path = %path, bytes = bytes.len(), "uploaded asset");
        Ok(url)
    }
}
