//! Postbox core library — post model, display dates, reader view, config.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`dates`] — `DD/MM/YY` display dates
//! - [`query`] — search + sort over a post list
//! - [`config`] — load / save `~/.postbox/config.yaml`
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod dates;
pub mod error;
pub mod query;
pub mod types;

pub use config::{AdminConfig, Config, RepoConfig, RetryConfig};
pub use error::ConfigError;
pub use types::{Draft, LocalImage, Post, PostId, Snapshot, VersionToken};
