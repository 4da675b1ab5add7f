//! Connection status types

use chrono::{DateTime, Utc};
use serde::Serialize;

use arr_settings_api::{AppType, Collection};

/// Per-entity connection status. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Checking,
    Connected {
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    Error {
        message: String,
    },
    Disabled,
    /// A required credential is missing or implausible; no request was made.
    Incomplete {
        reason: String,
    },
}

impl ConnectionStatus {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Short label for status badges.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Checking => "checking",
            Self::Connected { .. } => "connected",
            Self::Error { .. } => "error",
            Self::Disabled => "disabled",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("Not tested"),
            Self::Checking => f.write_str("Checking..."),
            Self::Connected { version: Some(v) } => write!(f, "Connected (v{v})"),
            Self::Connected { version: None } => f.write_str("Connected"),
            Self::Error { message } => write!(f, "Error: {message}"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Incomplete { reason } => f.write_str(reason),
        }
    }
}

/// Which list an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityScope {
    App(AppType),
    Collection(Collection),
}

/// Address of an editable entity: its list plus its position, or `None` for
/// an entity that has not been saved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntityKey {
    pub scope: EntityScope,
    pub index: Option<usize>,
}

impl EntityKey {
    #[must_use]
    pub fn instance(app: AppType, index: Option<usize>) -> Self {
        Self {
            scope: EntityScope::App(app),
            index,
        }
    }

    #[must_use]
    pub fn item(collection: Collection, index: Option<usize>) -> Self {
        Self {
            scope: EntityScope::Collection(collection),
            index,
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            EntityScope::App(app) => write!(f, "{app}")?,
            EntityScope::Collection(c) => write!(f, "{}", c.item_label())?,
        }
        match self.index {
            Some(i) => write!(f, "#{i}"),
            None => f.write_str("#new"),
        }
    }
}

/// Status plus when it was last resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}
