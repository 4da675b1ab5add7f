//! Editor session types

use serde::Serialize;

use arr_settings_api::AppType;

use crate::error::{CoreError, CoreResult};
use crate::types::InstanceConfig;

/// The instance being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorSession {
    pub app: AppType,
    /// `None` while editing an instance that has not been saved yet.
    pub index: Option<usize>,
    /// Deep copy of the instance as last loaded or saved.
    pub original: InstanceConfig,
}

impl EditorSession {
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.index.is_none()
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.index == Some(0)
    }
}

/// Editor navigator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditorState {
    Closed,
    Editing { dirty: bool },
}

impl EditorState {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Editing { .. })
    }

    #[must_use]
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::Editing { dirty: true })
    }
}

/// Enabled state of the save control, with its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveControl {
    pub dirty: bool,
    pub required_present: bool,
}

impl SaveControl {
    #[must_use]
    pub fn enabled(self) -> bool {
        self.dirty && self.required_present
    }

    /// `Ok` when a save may go ahead.
    pub fn ensure_enabled(self) -> CoreResult<()> {
        if !self.dirty {
            return Err(CoreError::NothingToSave);
        }
        if !self.required_present {
            return Err(CoreError::ValidationError(
                "Fill in the required fields before saving".to_string(),
            ));
        }
        Ok(())
    }
}
