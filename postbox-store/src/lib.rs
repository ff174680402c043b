//! # postbox-store
//!
//! Remote document store client: a versioned file store addressed by path,
//! used as a makeshift database for the posts document.
//!
//! - [`ContentStore`] — the transport seam (read / conditional write by path)
//! - [`GithubStore`] — GitHub contents API over HTTPS
//! - [`MemoryStore`] — in-process store with the same precondition rules
//! - [`RemoteDocuments`] — fetch / write / upload for the posts document

pub mod contents;
pub mod documents;
pub mod error;
pub mod github;
pub mod memory;

pub use contents::{AccessToken, ContentStore, FileWrite, Identity, RemoteFile, RepositoryAccess};
pub use documents::RemoteDocuments;
pub use error::StoreError;
pub use github::GithubStore;
pub use memory::MemoryStore;
