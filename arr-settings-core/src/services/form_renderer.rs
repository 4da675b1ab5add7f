//! Form rendering
//!
//! Builds a [`Form`] from an arbitrary partial settings object and a field
//! table, filling every missing field with its default, and paints it into
//! a [`FormContainer`] as HTML markup. Malformed input paints an error panel
//! instead of failing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde_json::Value;

use arr_settings_api::{AppType, Collection};

use crate::error::{CoreError, CoreResult};
use crate::schema::FieldTable;
use crate::types::{FieldDefault, FieldKind, FieldSpec, Form, InputValue};
use crate::utils::html::escape_html;

/// Mount point of one editor page: its markup plus the live form.
#[derive(Debug, Clone, Default)]
pub struct FormContainer {
    markup: String,
    form: Option<Form>,
    index: Option<usize>,
    error: Option<String>,
}

impl FormContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    #[must_use]
    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut Form> {
        self.form.as_mut()
    }

    /// Error shown instead of the form, if rendering failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Repaint the markup from the current inputs.
    pub fn refresh(&mut self) {
        if let Some(form) = &self.form {
            self.markup = FormRenderer::markup(form, self.index);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Stateless renderer.
pub struct FormRenderer;

impl FormRenderer {
    /// Field table used for an app's editor page.
    #[must_use]
    pub fn table_for(app: AppType) -> FieldTable {
        match app {
            AppType::General => FieldTable::general(),
            AppType::NzbHunt => FieldTable::for_collection(Collection::NzbServers),
            other => FieldTable::for_instance(other),
        }
    }

    /// Render the editor page of `app` from `source` into `container`.
    pub fn render(
        container: &mut FormContainer,
        app: AppType,
        source: &Value,
        index: Option<usize>,
    ) {
        Self::render_table(container, Self::table_for(app), source, index);
    }

    /// Render any field table from `source` into `container`, replacing
    /// its previous markup.
    pub fn render_table(
        container: &mut FormContainer,
        table: FieldTable,
        source: &Value,
        index: Option<usize>,
    ) {
        let title = table.title();
        match Self::build_form(table, source) {
            Ok(form) => {
                container.markup = Self::markup(&form, index);
                container.form = Some(form);
                container.index = index;
                container.error = None;
            }
            Err(e) => {
                log::warn!("Rendering {title} failed: {e}");
                let message = e.to_string();
                container.markup = Self::error_panel(title, &message);
                container.form = None;
                container.index = index;
                container.error = Some(message);
            }
        }
    }

    /// Build the form model without painting it.
    ///
    /// Only a non-object source is an error; wrongly typed fields fall back
    /// to their default with a warning.
    pub fn build_form(table: FieldTable, source: &Value) -> CoreResult<Form> {
        let base = match source {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(CoreError::MalformedSettings(format!(
                    "expected an object, got {}",
                    json_type(other)
                )));
            }
        };

        let mut inputs = BTreeMap::new();
        let mut stored_secrets = BTreeSet::new();
        for spec in table.iter() {
            let raw = base.get(spec.key).filter(|v| !v.is_null());
            if spec.kind.is_secret() {
                if raw.and_then(Value::as_str).is_some_and(|s| !s.is_empty()) {
                    stored_secrets.insert(spec.key);
                }
                // Secrets always start blank
                inputs.insert(spec.key, InputValue::Text(String::new()));
                continue;
            }
            let input = match raw {
                Some(value) => input_from_json(spec, value).unwrap_or_else(|| {
                    log::warn!(
                        "Field '{}' of {} has unexpected value {value}, using default",
                        spec.key,
                        table.title()
                    );
                    default_input(spec)
                }),
                None => default_input(spec),
            };
            inputs.insert(spec.key, input);
        }

        Ok(Form::new(table, inputs, stored_secrets, base))
    }

    /// HTML markup of a form. Secrets are never written into the markup.
    #[must_use]
    pub fn markup(form: &Form, index: Option<usize>) -> String {
        let table = form.table();
        let slug = slug(table.title());
        let mut html = String::new();

        let _ = write!(
            html,
            r#"<form class="settings-form" data-form="{slug}" data-index="{}">"#,
            index.map_or_else(|| "new".to_string(), |i| i.to_string())
        );

        let heading = form
            .text("name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| table.title().to_string(), str::to_string);
        let _ = write!(
            html,
            r#"<div class="form-header"><h3>{}</h3>"#,
            escape_html(&heading)
        );
        if index == Some(0) {
            html.push_str(r#"<span class="badge badge-default">Default</span>"#);
        }
        html.push_str("</div>");

        for spec in table.iter() {
            let id = format!("{slug}-{}", spec.key);
            let _ = write!(
                html,
                r#"<div class="form-field" data-key="{}"><label for="{id}">{}</label>"#,
                spec.key,
                escape_html(spec.label)
            );
            html.push_str(&field_markup(form, spec, &id));
            if let Some(help) = spec.help {
                let _ = write!(html, r#"<p class="field-help">{}</p>"#, escape_html(help));
            }
            html.push_str("</div>");
        }

        html.push_str(r#"<div class="connection-status" data-status="unknown"></div>"#);
        html.push_str(r#"<button type="submit" class="save-button" disabled>Save</button>"#);
        html.push_str("</form>");
        html
    }

    fn error_panel(title: &str, message: &str) -> String {
        format!(
            r#"<div class="settings-error" role="alert"><h3>Unable to load {}</h3><p>{}</p></div>"#,
            escape_html(title),
            escape_html(message)
        )
    }
}

fn field_markup(form: &Form, spec: &FieldSpec, id: &str) -> String {
    let name = spec.key;
    match spec.kind {
        FieldKind::Checkbox => {
            let checked = if form.checked(name).unwrap_or(false) {
                " checked"
            } else {
                ""
            };
            format!(r#"<input type="checkbox" id="{id}" name="{name}"{checked}>"#)
        }
        FieldKind::Password => {
            let placeholder = if form.has_stored_secret(name) {
                "Stored. Leave blank to keep it"
            } else {
                ""
            };
            format!(
                r#"<input type="password" id="{id}" name="{name}" value="" placeholder="{placeholder}" autocomplete="off">"#
            )
        }
        FieldKind::Select { options } => {
            let current = form.text(name).unwrap_or_default();
            let mut html = format!(r#"<select id="{id}" name="{name}">"#);
            for option in options {
                let selected = if option.value == current { " selected" } else { "" };
                let _ = write!(
                    html,
                    r#"<option value="{}"{selected}>{}</option>"#,
                    escape_html(option.value),
                    escape_html(option.label)
                );
            }
            html.push_str("</select>");
            html
        }
        FieldKind::Number { min, max } => {
            let mut attrs = String::new();
            if let Some(min) = min {
                let _ = write!(attrs, r#" min="{min}""#);
            }
            if let Some(max) = max {
                let _ = write!(attrs, r#" max="{max}""#);
            }
            format!(
                r#"<input type="number" id="{id}" name="{name}" value="{}"{attrs}>"#,
                escape_html(form.text(name).unwrap_or_default())
            )
        }
        FieldKind::Text | FieldKind::Url => {
            let kind = if spec.kind == FieldKind::Url { "url" } else { "text" };
            let required = if spec.required { " required" } else { "" };
            format!(
                r#"<input type="{kind}" id="{id}" name="{name}" value="{}"{required}>"#,
                escape_html(form.text(name).unwrap_or_default())
            )
        }
    }
}

fn default_input(spec: &FieldSpec) -> InputValue {
    match spec.default {
        FieldDefault::Bool(b) => InputValue::Checked(b),
        FieldDefault::Number(n) => InputValue::Text(n.to_string()),
        FieldDefault::Text(s) => InputValue::Text(s.to_string()),
    }
}

/// Input for a stored value, or `None` when the value has the wrong type.
fn input_from_json(spec: &FieldSpec, value: &Value) -> Option<InputValue> {
    match (spec.kind, value) {
        (FieldKind::Checkbox, Value::Bool(b)) => Some(InputValue::Checked(*b)),
        (FieldKind::Checkbox, Value::String(s)) => match s.trim() {
            "true" | "on" | "1" => Some(InputValue::Checked(true)),
            "false" | "off" | "0" | "" => Some(InputValue::Checked(false)),
            _ => None,
        },
        (FieldKind::Checkbox, _) => None,
        (FieldKind::Number { .. }, Value::Number(n)) => Some(InputValue::Text(n.to_string())),
        (FieldKind::Number { .. }, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(|_| InputValue::Text(s.trim().to_string())),
        (FieldKind::Number { .. }, _) => None,
        (FieldKind::Select { .. }, Value::String(s)) => {
            spec.accepts_option(s).then(|| InputValue::Text(s.clone()))
        }
        (FieldKind::Select { .. }, _) => None,
        (_, Value::String(s)) => Some(InputValue::Text(s.clone())),
        (_, Value::Number(n)) => Some(InputValue::Text(n.to_string())),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
