//! User-facing notifications raised by the sync subsystem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::LocalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

/// A message for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// Draft the notification concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Stays visible until the user acts on it (e.g. retry)
    pub actionable: bool,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            local_id: None,
            actionable: false,
            raised_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    #[must_use]
    pub fn for_draft(mut self, local_id: LocalId) -> Self {
        self.local_id = Some(local_id);
        self
    }

    #[must_use]
    pub fn actionable(mut self) -> Self {
        self.actionable = true;
        self
    }
}
