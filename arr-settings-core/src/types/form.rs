//! Editable form state
//!
//! A [`Form`] holds raw user input (strings and checkbox states), so an
//! out-of-range number typed by the user stays visible while editing.
//! Trimming, clamping and secret handling happen on [`Form::read_back`].

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use arr_settings_api::log_sanitizer::is_masked;

use crate::error::{CoreError, CoreResult};
use crate::schema::FieldTable;
use crate::types::{FieldKind, FieldSpec, FieldValue, FormSnapshot};

/// Raw value of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Text(String),
    Checked(bool),
}

/// Rendered form: a field table, its current inputs, and the settings object
/// it was built from.
#[derive(Debug, Clone)]
pub struct Form {
    table: FieldTable,
    inputs: BTreeMap<&'static str, InputValue>,
    /// Secret fields that have a value stored on the backend.
    stored_secrets: BTreeSet<&'static str>,
    /// Source object; unknown and backend-derived keys survive read-back.
    base: Map<String, Value>,
}

impl Form {
    pub(crate) fn new(
        table: FieldTable,
        inputs: BTreeMap<&'static str, InputValue>,
        stored_secrets: BTreeSet<&'static str>,
        base: Map<String, Value>,
    ) -> Self {
        Self {
            table,
            inputs,
            stored_secrets,
            base,
        }
    }

    #[must_use]
    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    #[must_use]
    pub fn input(&self, key: &str) -> Option<&InputValue> {
        self.inputs.get(key)
    }

    /// Raw text of a non-checkbox field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.inputs.get(key) {
            Some(InputValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn checked(&self, key: &str) -> Option<bool> {
        match self.inputs.get(key) {
            Some(InputValue::Checked(b)) => Some(*b),
            _ => None,
        }
    }

    /// Whether a secret field has a value stored on the backend.
    #[must_use]
    pub fn has_stored_secret(&self, key: &str) -> bool {
        self.stored_secrets.contains(key)
    }

    fn spec(&self, key: &str) -> CoreResult<FieldSpec> {
        self.table
            .get(key)
            .copied()
            .ok_or_else(|| CoreError::UnknownField(key.to_string()))
    }

    /// Type into a text, number, URL, password or select field.
    pub fn set_text(&mut self, key: &str, value: impl Into<String>) -> CoreResult<()> {
        let spec = self.spec(key)?;
        if spec.kind.is_checkbox() {
            return Err(CoreError::ValidationError(format!(
                "{} is a checkbox",
                spec.label
            )));
        }
        self.inputs.insert(spec.key, InputValue::Text(value.into()));
        Ok(())
    }

    /// Toggle a checkbox.
    pub fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        let spec = self.spec(key)?;
        if !spec.kind.is_checkbox() {
            return Err(CoreError::ValidationError(format!(
                "{} is not a checkbox",
                spec.label
            )));
        }
        self.inputs.insert(spec.key, InputValue::Checked(checked));
        Ok(())
    }

    /// Typed value of a field as it would be persisted.
    ///
    /// Returns `None` for unknown keys and for blank secret fields.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<FieldValue> {
        let spec = self.table.get(key)?;
        let input = self.inputs.get(key)?;
        match (spec.kind, input) {
            (_, InputValue::Checked(b)) => Some(FieldValue::Bool(*b)),
            (FieldKind::Number { .. }, InputValue::Text(raw)) => {
                Some(FieldValue::Number(parse_number(spec, raw)))
            }
            (FieldKind::Password, InputValue::Text(raw)) => {
                let raw = spec.normalize(raw);
                (!raw.is_empty()).then(|| FieldValue::Text(raw.to_string()))
            }
            (_, InputValue::Text(raw)) => Some(FieldValue::Text(spec.normalize(raw).to_string())),
        }
    }

    /// Text value of a field, trimmed where the field trims.
    #[must_use]
    pub fn normalized_text(&self, key: &str) -> String {
        match (self.table.get(key), self.text(key)) {
            (Some(spec), Some(raw)) => spec.normalize(raw).to_string(),
            _ => String::new(),
        }
    }

    /// At least one required (host/URL) field is non-empty.
    ///
    /// Tables without required fields always pass.
    #[must_use]
    pub fn has_required_values(&self) -> bool {
        let mut required = self.table.required_keys().peekable();
        if required.peek().is_none() {
            return true;
        }
        required.any(|key| !self.normalized_text(key).is_empty())
    }

    /// Run required-field and per-field validators.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.has_required_values() {
            let labels: Vec<_> = self
                .table
                .iter()
                .filter(|f| f.required)
                .map(|f| f.label)
                .collect();
            return Err(CoreError::ValidationError(format!(
                "{} is required",
                labels.join(" or ")
            )));
        }
        for spec in self.table.iter() {
            let Some(validate) = spec.validate else {
                continue;
            };
            let raw = self.normalized_text(spec.key);
            if raw.is_empty() {
                continue;
            }
            validate(&raw).map_err(|msg| {
                CoreError::ValidationError(format!("{} {msg}", spec.label))
            })?;
        }
        Ok(())
    }

    /// Current values, keyed by field.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::from_inputs(&self.table, &self.inputs)
    }

    /// Build the settings object to persist.
    ///
    /// Starts from the source object, then overwrites every field of the
    /// table: text is trimmed where the field trims, numbers are parsed and
    /// clamped (falling back to the default when unparsable), a blank secret
    /// keeps the stored value, and a blank secret whose stored value is only
    /// a mask is left out so the backend keeps what it has.
    #[must_use]
    pub fn read_back(&self) -> Map<String, Value> {
        let mut out = self.base.clone();
        for spec in self.table.iter() {
            let Some(input) = self.inputs.get(spec.key) else {
                continue;
            };
            let value = match (spec.kind, input) {
                (_, InputValue::Checked(b)) => Value::Bool(*b),
                (FieldKind::Number { .. }, InputValue::Text(raw)) => {
                    Value::from(parse_number(spec, raw))
                }
                (FieldKind::Password, InputValue::Text(raw)) => {
                    let raw = spec.normalize(raw);
                    if raw.is_empty() && self.stored_secrets.contains(spec.key) {
                        let masked = self
                            .base
                            .get(spec.key)
                            .and_then(Value::as_str)
                            .is_some_and(is_masked);
                        if masked {
                            out.remove(spec.key);
                        }
                        continue;
                    }
                    Value::String(raw.to_string())
                }
                (_, InputValue::Text(raw)) => Value::String(spec.normalize(raw).to_string()),
            };
            out.insert(spec.key.to_string(), value);
        }
        out
    }
}

fn parse_number(spec: &FieldSpec, raw: &str) -> i64 {
    let default = match spec.default.to_value() {
        FieldValue::Number(n) => n,
        _ => 0,
    };
    let trimmed = raw.trim();
    let parsed = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(round_to_i64));
    spec.kind.clamp(parsed.unwrap_or(default))
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_i64(value: f64) -> i64 {
    // `as` saturates on overflow and maps NaN to 0
    value.round() as i64
}
