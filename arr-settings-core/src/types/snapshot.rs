use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::FieldTable;
use crate::types::{FieldValue, InputValue};

/// Flat map of field key to value, taken at load and after each save.
///
/// Checkboxes are stored as booleans, everything else as the raw input text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot(BTreeMap<String, FieldValue>);

impl FormSnapshot {
    pub(crate) fn from_inputs(
        table: &FieldTable,
        inputs: &BTreeMap<&'static str, InputValue>,
    ) -> Self {
        let values = table
            .iter()
            .filter_map(|spec| {
                let value = match inputs.get(spec.key)? {
                    InputValue::Checked(b) => FieldValue::Bool(*b),
                    InputValue::Text(s) => FieldValue::Text(s.clone()),
                };
                Some((spec.key.to_string(), value))
            })
            .collect();
        Self(values)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
