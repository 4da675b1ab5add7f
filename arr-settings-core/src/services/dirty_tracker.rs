//! Dirty-state tracking
//!
//! Compares the current form against the snapshot taken at load and after
//! each save. Change detection can be suspended while a save round trip and
//! its repaint are in flight; suspension is held by an RAII [`SuspendGuard`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{FieldDefault, FieldKind, FieldValue, Form, FormSnapshot, SaveControl};

/// Tracks the last saved snapshot of one form.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    baseline: Option<FormSnapshot>,
    suspended: Arc<AtomicUsize>,
}

impl DirtyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current form values.
    #[must_use]
    pub fn snapshot(form: &Form) -> FormSnapshot {
        form.snapshot()
    }

    /// Remember `snapshot` as the last saved state.
    pub fn set_baseline(&mut self, snapshot: FormSnapshot) {
        self.baseline = Some(snapshot);
    }

    pub fn clear_baseline(&mut self) {
        self.baseline = None;
    }

    #[must_use]
    pub fn baseline(&self) -> Option<&FormSnapshot> {
        self.baseline.as_ref()
    }

    /// Keys whose current value differs from `last`.
    ///
    /// Checkboxes compare as booleans; everything else compares as strings,
    /// trimmed where the field trims. Without a snapshot, a field counts as
    /// changed when it holds a non-empty value that differs from its default.
    #[must_use]
    pub fn changed_fields(form: &Form, last: Option<&FormSnapshot>) -> Vec<&'static str> {
        let current = form.snapshot();
        form.table()
            .iter()
            .filter(|spec| {
                let now = current.get(spec.key);
                match last {
                    Some(last) => {
                        let then = last.get(spec.key);
                        match spec.kind {
                            FieldKind::Checkbox => as_bool(now) != as_bool(then),
                            _ => {
                                spec.normalize(&as_text(now)) != spec.normalize(&as_text(then))
                            }
                        }
                    }
                    None => match (spec.kind, spec.default) {
                        (FieldKind::Checkbox, default) => as_bool(now) != default.as_bool(),
                        (_, default) => {
                            let text = as_text(now);
                            let text = spec.normalize(&text);
                            !text.is_empty() && text != default_text(default)
                        }
                    },
                }
            })
            .map(|spec| spec.key)
            .collect()
    }

    /// Whether `form` differs from `last` in at least one field.
    #[must_use]
    pub fn is_dirty(form: &Form, last: Option<&FormSnapshot>) -> bool {
        !Self::changed_fields(form, last).is_empty()
    }

    /// Save control state for `form`. While suspended nothing is dirty.
    #[must_use]
    pub fn evaluate(&self, form: &Form) -> SaveControl {
        SaveControl {
            dirty: !self.is_suspended() && Self::is_dirty(form, self.baseline.as_ref()),
            required_present: form.has_required_values(),
        }
    }

    /// Suspend change detection until the returned guard is dropped.
    ///
    /// Guards nest; detection resumes when the last one is dropped.
    #[must_use]
    pub fn suspend(&self) -> SuspendGuard {
        self.suspended.fetch_add(1, Ordering::SeqCst);
        SuspendGuard {
            counter: Arc::clone(&self.suspended),
        }
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst) > 0
    }
}

/// Holds change detection suspended; releases on drop, including on early
/// return through `?`.
#[derive(Debug)]
pub struct SuspendGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

fn as_bool(value: Option<&FieldValue>) -> bool {
    matches!(value, Some(FieldValue::Bool(true)))
}

fn as_text(value: Option<&FieldValue>) -> String {
    value.map(FieldValue::display).unwrap_or_default()
}

fn default_text(default: FieldDefault) -> String {
    default.to_value().display()
}
