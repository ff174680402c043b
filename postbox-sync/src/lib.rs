//! # postbox-sync
//!
//! Local staging and the publish engine.
//!
//! Stage edits with [`Staging`], then call [`PublishEngine::publish`] to
//! merge them onto a freshly fetched snapshot and write the result back
//! under optimistic concurrency control.

pub mod error;
pub mod merge;
pub mod publish;
pub mod staging;
pub mod status;

pub use error::{PublishError, StagingError};
pub use publish::{PublishEngine, PublishReport, Refresh};
pub use staging::{DeleteOutcome, EntryState, PendingAdd, PendingSummary, Staging, WorkingEntry};
pub use status::{StatusEvent, StatusKind, StatusSender};
