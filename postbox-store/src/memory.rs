//! In-process [`ContentStore`] with the same version-precondition rules as
//! the HTTP store, plus fault injection for exercising retry paths.
//!
//! Clones share state; [`ContentStore::authorized`] returns a clone bound to
//! a token, so two handles behave like two browser tabs on one repository.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use postbox_core::VersionToken;
use sha2::{Digest, Sha256};

use crate::contents::{AccessToken, ContentStore, FileWrite, Identity, RemoteFile, RepositoryAccess};
use crate::error::StoreError;

const DEFAULT_BASE_URL: &str = "memory://store";

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
    token: Option<AccessToken>,
    base_url: String,
}

#[derive(Default)]
struct MemoryState {
    files: HashMap<String, StoredFile>,
    revision: u64,
    grants: HashMap<String, Grant>,
    faults: Faults,
    requests: Vec<String>,
}

struct StoredFile {
    content: Vec<u8>,
    version: VersionToken,
}

struct Grant {
    login: String,
    push: bool,
}

#[derive(Default)]
struct Faults {
    forced_conflicts: u32,
    failed_reads: u32,
    interleaved: VecDeque<(String, Vec<u8>)>,
    failing_prefixes: Vec<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store with no tokens granted.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState::default())),
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// An empty store plus a handle authorized with a push-capable `token`.
    pub fn with_writer(token: &str) -> Self {
        let store = Self::new();
        store.grant(token, "admin", true);
        store.authorized(AccessToken::from(token))
    }

    /// Register `token` as belonging to `login`, with or without push access.
    pub fn grant(&self, token: &str, login: &str, push: bool) {
        self.state().grants.insert(
            token.to_string(),
            Grant {
                login: login.to_string(),
                push,
            },
        );
    }

    /// Write `content` at `path` as some other client would, bypassing the
    /// precondition. Returns the new revision's token.
    pub fn put_raw(&self, path: &str, content: impl Into<Vec<u8>>) -> VersionToken {
        let mut state = self.state();
        state.store(path, content.into())
    }

    pub fn get_raw(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).map(|f| f.content.clone())
    }

    pub fn version(&self, path: &str) -> Option<VersionToken> {
        self.state().files.get(path).map(|f| f.version.clone())
    }

    /// Reject the next `count` writes with a conflict.
    pub fn force_conflicts(&self, count: u32) {
        self.state().faults.forced_conflicts = count;
    }

    /// Fail the next `count` reads with HTTP 503.
    pub fn fail_reads(&self, count: u32) {
        self.state().faults.failed_reads = count;
    }

    /// Land a foreign write to `path` just before our next write to it,
    /// as if another session won the race.
    pub fn interleave_write(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.state()
            .faults
            .interleaved
            .push_back((path.to_string(), content.into()));
    }

    /// Fail every write to a path starting with `prefix` with HTTP 500.
    pub fn fail_writes_under(&self, prefix: &str) {
        self.state().faults.failing_prefixes.push(prefix.to_string());
    }

    /// Requests served so far, as `"GET path"` / `"PUT path"`.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn store(&mut self, path: &str, content: Vec<u8>) -> VersionToken {
        self.revision += 1;
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(self.revision.to_be_bytes());
        hasher.update(&content);
        let version = VersionToken(hex::encode(hasher.finalize()));
        self.files.insert(
            path.to_string(),
            StoredFile {
                content,
                version: version.clone(),
            },
        );
        version
    }

    fn take_interleaved(&mut self, path: &str) -> Option<Vec<u8>> {
        let index = self
            .faults
            .interleaved
            .iter()
            .position(|(p, _)| p == path)?;
        self.faults.interleaved.remove(index).map(|(_, content)| content)
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let mut state = self.state();
        state.requests.push(format!("GET {path}"));
        if state.faults.failed_reads > 0 {
            state.faults.failed_reads -= 1;
            return Err(StoreError::Status {
                path: path.to_string(),
                status: 503,
                message: "injected read failure".to_string(),
            });
        }
        Ok(state.files.get(path).map(|f| RemoteFile {
            version: f.version.clone(),
            content: f.content.clone(),
        }))
    }

    async fn write_file(
        &self,
        path: &str,
        write: FileWrite<'_>,
    ) -> Result<VersionToken, StoreError> {
        let mut state = self.state();
        state.requests.push(format!("PUT {path}"));

        let Some(token) = self.token.as_ref() else {
            return Err(StoreError::MissingToken);
        };
        match state.grants.get(token.expose()) {
            Some(grant) if grant.push => {}
            Some(_) => {
                return Err(StoreError::Unauthorized(format!(
                    "token cannot push to {path}"
                )))
            }
            None => return Err(StoreError::Unauthorized("bad credentials".to_string())),
        }

        if state
            .faults
            .failing_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Err(StoreError::Status {
                path: path.to_string(),
                status: 500,
                message: "injected write failure".to_string(),
            });
        }

        if let Some(foreign) = state.take_interleaved(path) {
            state.store(path, foreign);
        }

        if state.faults.forced_conflicts > 0 {
            state.faults.forced_conflicts -= 1;
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        let current = state.files.get(path).map(|f| &f.version);
        if current != write.expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        Ok(state.store(path, write.content.to_vec()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn identity(&self, token: &AccessToken) -> Result<Identity, StoreError> {
        let mut state = self.state();
        state.requests.push("GET user".to_string());
        state
            .grants
            .get(token.expose())
            .map(|grant| Identity {
                login: grant.login.clone(),
            })
            .ok_or_else(|| StoreError::Unauthorized("bad credentials".to_string()))
    }

    async fn repository_access(
        &self,
        token: &AccessToken,
    ) -> Result<RepositoryAccess, StoreError> {
        let mut state = self.state();
        state.requests.push("GET repo".to_string());
        state
            .grants
            .get(token.expose())
            .map(|grant| RepositoryAccess { push: grant.push })
            .ok_or_else(|| StoreError::Unauthorized("bad credentials".to_string()))
    }

    fn authorized(&self, token: AccessToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: Some(token),
            base_url: self.base_url.clone(),
        }
    }
}
