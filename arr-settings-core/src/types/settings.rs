//! Cached settings documents

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use arr_settings_api::log_sanitizer::{is_masked, mask_secret};

use crate::error::CoreResult;

fn default_true() -> bool {
    true
}

/// One configured connection to an *arr instance.
///
/// Identity is the position in [`AppSettings::instances`]; position 0 is the
/// default instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_url: String,
    /// `None` when the key is left out so the backend keeps its stored one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hunt counts, modes, delays, caps, timeouts and tag names.
    #[serde(flatten)]
    pub tuning: Map<String, Value>,
}

impl InstanceConfig {
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Stored key with all but the last characters masked.
    #[must_use]
    pub fn masked_key(&self) -> String {
        self.api_key.as_deref().map(mask_secret).unwrap_or_default()
    }

    /// Drop a masked key so the backend keeps its stored one.
    pub fn strip_masked_key(&mut self) {
        if self.api_key.as_deref().is_some_and(is_masked) {
            self.api_key = None;
        }
    }

    /// Display name, falling back to the position.
    #[must_use]
    pub fn display_name(&self, index: usize) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("Instance {}", index + 1)
        } else {
            name.to_string()
        }
    }
}

/// One app's settings section: ordered instances plus app-level scalars.
///
/// A mirror of the backend copy; never the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSettings {
    /// Parse a section; `null` yields an empty section.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Body for a save. No instance carries a masked key.
    pub fn to_payload(&self) -> CoreResult<Value> {
        let mut outgoing = self.clone();
        outgoing
            .instances
            .iter_mut()
            .for_each(InstanceConfig::strip_masked_key);
        outgoing.to_value()
    }

    #[must_use]
    pub fn instance(&self, index: usize) -> Option<&InstanceConfig> {
        self.instances.get(index)
    }

    /// Instance at position 0, if any.
    #[must_use]
    pub fn default_instance(&self) -> Option<&InstanceConfig> {
        self.instances.first()
    }

    /// Default-ness is derived from position, never stored.
    #[must_use]
    pub fn is_default(index: usize) -> bool {
        index == 0
    }
}
