//! Declarative field descriptions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation hook run on the trimmed raw input of a non-empty field.
pub type Validator = fn(&str) -> Result<(), String>;

/// One option of a select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl SelectOption {
    pub const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

/// Input kind of a field, which drives markup and read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Secret text; never written into markup.
    Password,
    Url,
    /// Integer, clamped to `[min, max]` on read-back.
    Number {
        min: Option<i64>,
        max: Option<i64>,
    },
    Checkbox,
    Select {
        options: &'static [SelectOption],
    },
}

impl FieldKind {
    #[must_use]
    pub fn is_checkbox(self) -> bool {
        matches!(self, Self::Checkbox)
    }

    #[must_use]
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Password)
    }

    /// Clamp a number into the declared range. Non-numeric kinds pass through.
    #[must_use]
    pub fn clamp(self, value: i64) -> i64 {
        match self {
            Self::Number { min, max } => {
                let value = min.map_or(value, |m| value.max(m));
                max.map_or(value, |m| value.min(m))
            }
            _ => value,
        }
    }
}

/// Typed field value, as stored in settings documents and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl FieldValue {
    /// JSON representation for a settings document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Text shown in an input for this value.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Compile-time default of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Number(i64),
    Bool(bool),
}

impl FieldDefault {
    #[must_use]
    pub fn to_value(self) -> FieldValue {
        match self {
            Self::Text(s) => FieldValue::Text(s.to_string()),
            Self::Number(n) => FieldValue::Number(n),
            Self::Bool(b) => FieldValue::Bool(b),
        }
    }

    #[must_use]
    pub fn as_bool(self) -> bool {
        matches!(self, Self::Bool(true))
    }
}

/// A row of a field table: `{key, kind, default, validate}` plus display data.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key in the settings object.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    /// Host/URL-like field; saving needs at least one of these filled in.
    pub required: bool,
    /// Compare and persist the trimmed input.
    pub trim: bool,
    pub validate: Option<Validator>,
    pub help: Option<&'static str>,
}

impl FieldSpec {
    const fn base(
        key: &'static str,
        label: &'static str,
        kind: FieldKind,
        default: FieldDefault,
    ) -> Self {
        Self {
            key,
            label,
            kind,
            default,
            required: false,
            trim: false,
            validate: None,
            help: None,
        }
    }

    pub const fn text(key: &'static str, label: &'static str, default: &'static str) -> Self {
        Self::base(key, label, FieldKind::Text, FieldDefault::Text(default)).trimmed()
    }

    pub const fn password(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Password, FieldDefault::Text("")).trimmed()
    }

    pub const fn url(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Url, FieldDefault::Text("")).trimmed()
    }

    pub const fn number(
        key: &'static str,
        label: &'static str,
        default: i64,
        min: i64,
        max: i64,
    ) -> Self {
        Self::base(
            key,
            label,
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
            },
            FieldDefault::Number(default),
        )
        .trimmed()
    }

    pub const fn checkbox(key: &'static str, label: &'static str, default: bool) -> Self {
        Self::base(key, label, FieldKind::Checkbox, FieldDefault::Bool(default))
    }

    pub const fn select(
        key: &'static str,
        label: &'static str,
        options: &'static [SelectOption],
        default: &'static str,
    ) -> Self {
        Self::base(
            key,
            label,
            FieldKind::Select { options },
            FieldDefault::Text(default),
        )
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub const fn untrimmed(mut self) -> Self {
        self.trim = false;
        self
    }

    #[must_use]
    pub const fn validated(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    #[must_use]
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Normalize raw input for comparison and persistence.
    #[must_use]
    pub fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        if self.trim { raw.trim() } else { raw }
    }

    /// Whether `value` is one of the select options (always true for other kinds).
    #[must_use]
    pub fn accepts_option(&self, value: &str) -> bool {
        match self.kind {
            FieldKind::Select { options } => options.iter().any(|o| o.value == value),
            _ => true,
        }
    }
}

/// Check that a URL is absolute http(s).
pub fn validate_http_url(raw: &str) -> Result<(), String> {
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => Ok(()),
        Ok(_) => Err("must start with http:// or https://".to_string()),
        Err(e) => Err(format!("is not a valid URL ({e})")),
    }
}

/// Check that a tag name is usable as an *arr tag.
pub fn validate_tag(raw: &str) -> Result<(), String> {
    if raw.chars().any(|c| c == ',' || c.is_whitespace()) {
        return Err("must not contain spaces or commas".to_string());
    }
    if raw.chars().count() > 25 {
        return Err("must be at most 25 characters".to_string());
    }
    Ok(())
}

/// Check a host name or IP address (no scheme, no path).
pub fn validate_host(raw: &str) -> Result<(), String> {
    if raw.contains("://") || raw.contains('/') {
        return Err("must be a host name, without scheme or path".to_string());
    }
    if raw.chars().any(char::is_whitespace) {
        return Err("must not contain spaces".to_string());
    }
    Ok(())
}
