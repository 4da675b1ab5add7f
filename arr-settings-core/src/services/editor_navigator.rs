//! Instance editor navigation
//!
//! Switches the visible instance editor without a reload. State machine:
//!
//! ```text
//! Closed --open--> Editing(clean) --input--> Editing(dirty)
//! Editing(dirty) --save ok--> Editing(clean)
//! Editing(dirty) --request_close, confirmed--> Closed
//! Editing(clean) --request_close--> Closed
//! ```
//!
//! Opening while an editor is open first passes through `request_close`.

use std::sync::Arc;

use serde_json::{Map, Value};

use arr_settings_api::AppType;

use crate::error::{CoreError, CoreResult};
use crate::services::{
    ConnectionProber, DirtyTracker, FormContainer, FormRenderer, ProbeTarget, ServiceContext,
    SettingsPersister,
};
use crate::traits::DiscardConfirmer;
use crate::types::{
    AppSettings, ConnectionStatus, EditorSession, EditorState, EntityKey, InstanceConfig,
    SaveControl,
};

/// Fields whose edits trigger a debounced connection probe.
const CONNECTION_KEYS: [&str; 3] = ["api_url", "api_key", "enabled"];

/// Editor for one *arr instance at a time.
pub struct EditorNavigator {
    ctx: Arc<ServiceContext>,
    confirmer: Arc<dyn DiscardConfirmer>,
    prober: ConnectionProber,
    persister: SettingsPersister,
    tracker: DirtyTracker,
    container: FormContainer,
    session: Option<EditorSession>,
    state: EditorState,
    control: SaveControl,
}

impl EditorNavigator {
    #[must_use]
    pub fn new(
        ctx: Arc<ServiceContext>,
        confirmer: Arc<dyn DiscardConfirmer>,
        prober: ConnectionProber,
    ) -> Self {
        Self {
            persister: SettingsPersister::new(Arc::clone(&ctx)),
            ctx,
            confirmer,
            prober,
            tracker: DirtyTracker::new(),
            container: FormContainer::new(),
            session: None,
            state: EditorState::Closed,
            control: SaveControl::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn container(&self) -> &FormContainer {
        &self.container
    }

    #[must_use]
    pub fn save_control(&self) -> SaveControl {
        self.control
    }

    #[must_use]
    pub fn save_enabled(&self) -> bool {
        self.control.enabled()
    }

    #[must_use]
    pub fn prober(&self) -> &ConnectionProber {
        &self.prober
    }

    fn entity_key(&self) -> Option<EntityKey> {
        self.session
            .as_ref()
            .map(|s| EntityKey::instance(s.app, s.index))
    }

    /// Connection status of the instance being edited.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.entity_key()
            .map(|key| self.prober.status(key))
            .unwrap_or_default()
    }

    // ===== Navigation =====

    /// Open the editor for instance `index` of `app`, or for a new instance.
    ///
    /// Returns `Ok(false)` when another editor holds unsaved edits and the
    /// user chose to keep them.
    pub async fn open(&mut self, app: AppType, index: Option<usize>) -> CoreResult<bool> {
        if !app.has_instances() {
            return Err(CoreError::UnsupportedApp(app));
        }
        if self.state.is_open() && !self.request_close().await {
            return Ok(false);
        }

        self.ctx
            .cache
            .ensure_loaded(self.ctx.backend.as_ref())
            .await?;
        let settings = self.ctx.cache.app_settings(app).await?;
        let source = match index {
            Some(i) => settings
                .instance(i)
                .ok_or(CoreError::InstanceNotFound { app, index: i })?
                .to_value()?,
            None => Value::Object(Map::new()),
        };

        FormRenderer::render(&mut self.container, app, &source, index);
        let Some(form) = self.container.form() else {
            // The error panel is already painted
            let message = self.container.error().unwrap_or_default().to_string();
            return Err(CoreError::MalformedSettings(message));
        };

        // A new instance has no snapshot; dirtiness falls back to non-default values
        self.tracker.clear_baseline();
        if index.is_some() {
            self.tracker.set_baseline(form.snapshot());
        }
        let original = InstanceConfig::from_value(&Value::Object(form.read_back()))?;
        let target = ProbeTarget::from_instance_form(app, form, index);

        self.session = Some(EditorSession {
            app,
            index,
            original,
        });
        self.state = EditorState::Editing { dirty: false };
        self.recompute();
        self.prober.schedule(EntityKey::instance(app, index), target);

        match index {
            Some(i) => log::info!("Editing {app} instance #{i}"),
            None => log::info!("Editing new {app} instance"),
        }
        Ok(true)
    }

    /// Close the editor, asking for confirmation when there are unsaved edits.
    ///
    /// Returns whether the editor is now closed.
    pub async fn request_close(&mut self) -> bool {
        match self.state {
            EditorState::Closed => true,
            EditorState::Editing { dirty: false } => {
                self.close();
                true
            }
            EditorState::Editing { dirty: true } => {
                let confirmed = match &self.session {
                    Some(session) => self.confirmer.confirm_discard(session).await,
                    None => true,
                };
                if confirmed {
                    log::debug!("Discarding unsaved edits");
                    self.close();
                }
                confirmed
            }
        }
    }

    /// Close unconditionally, dropping unsaved edits.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take()
            && session.index.is_none()
        {
            self.prober.forget(EntityKey::instance(session.app, None));
        }
        self.container.clear();
        self.tracker.clear_baseline();
        self.state = EditorState::Closed;
        self.control = SaveControl::default();
    }

    // ===== Input events =====

    /// Type into a field of the open form.
    pub fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()> {
        let form = self.container.form_mut().ok_or(CoreError::EditorClosed)?;
        form.set_text(key, value)?;
        self.after_input(key);
        Ok(())
    }

    /// Toggle a checkbox of the open form.
    pub fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        let form = self.container.form_mut().ok_or(CoreError::EditorClosed)?;
        form.set_checked(key, checked)?;
        self.after_input(key);
        Ok(())
    }

    fn after_input(&mut self, key: &str) {
        self.recompute();
        if !CONNECTION_KEYS.contains(&key) {
            return;
        }
        if let (Some(session), Some(form)) = (&self.session, self.container.form()) {
            let target = ProbeTarget::from_instance_form(session.app, form, session.index);
            self.prober
                .schedule(EntityKey::instance(session.app, session.index), target);
        }
    }

    fn recompute(&mut self) {
        self.control = self
            .container
            .form()
            .map(|form| self.tracker.evaluate(form))
            .unwrap_or_default();
        if self.state.is_open() {
            self.state = EditorState::Editing {
                dirty: self.control.dirty,
            };
        }
    }

    // ===== Save =====

    /// Persist the open form.
    ///
    /// The form is merged into the cached app settings (appended for a new
    /// instance), saved, and the editor is repainted from the server's copy.
    /// The instance is then probed. On failure the editor keeps its edits.
    /// Nothing is sent while the save control is disabled.
    pub async fn save(&mut self) -> CoreResult<InstanceConfig> {
        let session = self.session.clone().ok_or(CoreError::EditorClosed)?;
        let app = session.app;
        self.recompute();
        self.control.ensure_enabled()?;
        let (validation, values) = {
            let form = self.container.form().ok_or(CoreError::EditorClosed)?;
            (form.validate(), form.read_back())
        };
        if let Err(e) = validation {
            self.ctx.report_error(&format!("Saving {app} instance"), &e);
            self.recompute();
            return Err(e);
        }

        let instance = InstanceConfig::from_value(&Value::Object(values))?;
        let mut settings = self.ctx.cache.app_settings(app).await?;
        let index = match session.index {
            Some(i) if i < settings.instances.len() => {
                settings.instances[i] = instance;
                i
            }
            Some(i) => return Err(CoreError::InstanceNotFound { app, index: i }),
            None => {
                settings.instances.push(instance);
                settings.instances.len() - 1
            }
        };
        let payload = settings.to_payload()?;

        let container = &mut self.container;
        let result = self
            .persister
            .save(app, &payload, &self.tracker, |saved| {
                let section = saved
                    .get("instances")
                    .and_then(|list| list.get(index))
                    .cloned()
                    .unwrap_or(Value::Null);
                FormRenderer::render(container, app, &section, Some(index));
            })
            .await;
        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                self.recompute();
                return Err(e);
            }
        };

        let stored = AppSettings::from_value(&saved)?
            .instances
            .get(index)
            .cloned()
            .ok_or(CoreError::InstanceNotFound { app, index })?;
        if let Some(form) = self.container.form() {
            self.tracker.set_baseline(form.snapshot());
        }
        if session.is_new() {
            self.prober.rekey(
                EntityKey::instance(app, None),
                EntityKey::instance(app, Some(index)),
            );
        }
        self.session = Some(EditorSession {
            app,
            index: Some(index),
            original: stored.clone(),
        });
        self.state = EditorState::Editing { dirty: false };
        self.recompute();

        let key = EntityKey::instance(app, Some(index));
        let status = self
            .prober
            .probe_now(key, &ProbeTarget::from_instance(app, &stored, Some(index)))
            .await;
        log::debug!("{key} after save: {status}");
        Ok(stored)
    }
}
