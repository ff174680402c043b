//! Domain types for the postbox document.
//!
//! The remote document is a JSON array of [`Post`] records with camelCase
//! keys. Field order and key names are part of the wire format read by the
//! public blog page, so they must not change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Title given to drafts submitted without one.
pub const UNTITLED_TITLE: &str = "UNTITLED POST";

/// Body text colour used when a draft does not pick one.
pub const DEFAULT_BODY_COLOR: &str = "#ffffff";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque, client-generated post identifier. Never reused once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque token identifying the exact revision of a remote file.
///
/// Presented on write to prove the writer last read the revision it is
/// about to replace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(pub String);

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VersionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VersionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A published (or about to be published) blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    /// `DD/MM/YY` display date; also the default sort key.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_color: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_body_color")]
    pub color: String,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_body_color() -> String {
    DEFAULT_BODY_COLOR.to_string()
}

/// Raw image bytes attached to a draft. Only valid for the current session;
/// resolved to a durable URL on publish.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. `jpg`.
    pub extension: String,
}

impl LocalImage {
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }
}

impl fmt::Debug for LocalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImage")
            .field("len", &self.bytes.len())
            .field("extension", &self.extension)
            .finish()
    }
}

/// Admin-composed content that has not been assigned an id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub title_color: Option<String>,
    pub content: String,
    pub color: Option<String>,
    /// Images that already have a durable URL.
    pub images: Vec<String>,
    /// Images that still need uploading.
    pub local_images: Vec<LocalImage>,
}

impl Draft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_local_image(mut self, image: LocalImage) -> Self {
        self.local_images.push(image);
        self
    }

    /// Turn the draft into a post with the given id and date, splitting off
    /// the transient image payloads.
    pub fn into_post(self, id: PostId, date: String) -> (Post, Vec<LocalImage>) {
        let title = if self.title.trim().is_empty() {
            UNTITLED_TITLE.to_string()
        } else {
            self.title
        };
        let post = Post {
            id,
            date,
            title,
            title_color: self.title_color,
            content: self.content,
            color: self.color.unwrap_or_else(default_body_color),
            images: self.images,
        };
        (post, self.local_images)
    }
}

/// One observation of the remote document: the posts plus the token of the
/// revision they were read from. `version` is `None` when the document does
/// not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub version: Option<VersionToken>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.posts.iter().any(|p| &p.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
