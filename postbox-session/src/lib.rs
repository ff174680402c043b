//! # postbox-session
//!
//! The identity gate and the per-session admin context.
//!
//! A [`Session`] starts logged out. [`Session::login`] runs both checks
//! (the cosmetic credential digest and the write-token check) and, only if
//! both pass, builds an [`AdminContext`] holding the token-bound store, the
//! publish engine and a fresh [`postbox_sync::Staging`]. Logging out drops
//! the whole context, token and unpublished changes included.

pub mod error;
pub mod gate;
pub mod session;

pub use error::{GateError, SessionError};
pub use gate::{digest_hex, verify_credentials, verify_write_token};
pub use session::{AdminContext, Session};
