//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use arr_settings_api::{AppType, Collection};

// Re-export the transport error type
pub use arr_settings_api::ApiError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No instance at this position
    #[error("Instance not found: {app} #{index}")]
    InstanceNotFound { app: AppType, index: usize },

    /// No collection item at this position
    #[error("Item not found: {collection} #{index}")]
    ItemNotFound { collection: Collection, index: usize },

    /// Source settings could not be turned into a form
    #[error("Malformed settings: {0}")]
    MalformedSettings(String),

    /// Field key not present in the field table
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Validation error (caught before any network call)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Save requested with nothing changed
    #[error("Nothing to save")]
    NothingToSave,

    /// Operation requires an open editor
    #[error("No editor is open")]
    EditorClosed,

    /// Operation does not apply to this app
    #[error("Not supported for {0}")]
    UnsupportedApp(AppType),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Backend error (converted from the api crate)
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, missing entity, rejected
    /// credentials), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::InstanceNotFound { .. }
            | Self::ItemNotFound { .. }
            | Self::UnknownField(_)
            | Self::ValidationError(_)
            | Self::NothingToSave
            | Self::EditorClosed
            | Self::UnsupportedApp(_) => true,
            Self::Api(e) => e.is_expected(),
            _ => false,
        }
    }

    /// Text for a transient notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::ValidationError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
