//! Type definition module

mod config;
mod editor;
mod field;
mod form;
mod notification;
mod settings;
mod snapshot;
mod status;

pub use config::{
    DEFAULT_AUTO_SAVE_MS, DEFAULT_MIN_API_KEY_LEN, DEFAULT_PROBE_DEBOUNCE_MS,
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_SETTLE_MS, EditorConfig, PROBE_DEBOUNCE_RANGE_MS,
};
pub use editor::{EditorSession, EditorState, SaveControl};
pub use field::{
    FieldDefault, FieldKind, FieldSpec, FieldValue, SelectOption, Validator, validate_host,
    validate_http_url, validate_tag,
};
pub use form::{Form, InputValue};
pub use notification::{Notification, NotificationLevel};
pub use settings::{AppSettings, InstanceConfig};
pub use snapshot::FormSnapshot;
pub use status::{ConnectionStatus, EntityKey, EntityScope, StatusEntry};

// Re-export api crate public types
pub use arr_settings_api::{
    AppType, Collection, ServerSettings, TestConnectionRequest, TestConnectionResponse,
};
