//! Status events for the presentation layer: a state plus a message.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

/// How long success and error notices stay on screen.
pub const TERMINAL_NOTICE: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Loading,
    Saving,
    Uploading,
    Success,
    Error,
}

impl StatusKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusKind::Success | StatusKind::Error)
    }

    /// In-progress states stay until replaced; terminal ones self-dismiss.
    pub fn dismiss_after(self) -> Option<Duration> {
        self.is_terminal().then_some(TERMINAL_NOTICE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusEvent {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type StatusSender = mpsc::UnboundedSender<StatusEvent>;
