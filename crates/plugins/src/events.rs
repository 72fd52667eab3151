//! Host event types handed to plugins.
//!
//! These are read-only views of the error-tracking platform's data model:
//! plugins never construct or mutate them outside of tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag key carrying the event's severity level.
pub const LEVEL_TAG: &str = "level";

/// Severity level of a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Unrecoverable crash
    Fatal,
    /// Error
    Error,
    /// Warning
    Warning,
    /// Informational
    Info,
    /// Debug output
    Debug,
}

impl Level {
    /// Parse a level tag value. Unknown values yield `None`.
    #[must_use]
    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "fatal" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Get the Slack attachment color for this level (hex, no `#`).
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Fatal => "d20f2a",
            Self::Error => "f43f20",
            Self::Warning => "f18500",
            Self::Info => "2788ce",
            Self::Debug => "cfd3da",
        }
    }
}

/// Project an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    /// Full display name, e.g. "foo Bar"
    pub name: String,
    pub slug: String,
    pub organization_slug: String,
}

/// Authenticated user attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    #[serde(default)]
    pub id: Option<String>,
}

/// A captured error occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub event_id: String,
    /// Issue (group) the event was aggregated into
    pub group_id: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<EventUser>,
    /// Code location the error is attributed to
    #[serde(default)]
    pub culprit: Option<String>,
    pub message: String,
    pub project: Project,
    /// Tags in the order the host recorded them
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

impl ErrorEvent {
    /// Short title used in notifications.
    #[must_use]
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Look up a tag value by key.
    #[must_use]
    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Level taken from the `level` tag, if present and recognized.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        self.get_tag(LEVEL_TAG).and_then(Level::from_tag)
    }

    /// Authenticated user id, if the event carries a non-empty one.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|user| user.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Alert rule that triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    pub id: u64,
    pub label: String,
}

/// An event paired with the rule(s) that fired for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event: ErrorEvent,
    #[serde(default)]
    pub rules: Vec<NotificationRule>,
}

impl Notification {
    /// Create a notification fired by a single rule.
    #[must_use]
    pub fn new(event: ErrorEvent, rule: NotificationRule) -> Self {
        Self {
            event,
            rules: vec![rule],
        }
    }
}
