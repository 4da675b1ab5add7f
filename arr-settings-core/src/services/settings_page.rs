//! App-level settings page with auto-save
//!
//! Each edit restarts a quiet-period timer. The front end polls [`SettingsPage::tick`]
//! from its event loop; once the timer runs out the page saves itself.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use arr_settings_api::AppType;

use crate::error::{CoreError, CoreResult};
use crate::schema::FieldTable;
use crate::services::{DirtyTracker, FormContainer, FormRenderer, ServiceContext, SettingsPersister};
use crate::types::{Form, SaveControl};

/// Editor for the non-instance settings of one app.
pub struct SettingsPage {
    ctx: Arc<ServiceContext>,
    app: AppType,
    table: FieldTable,
    persister: SettingsPersister,
    tracker: DirtyTracker,
    container: FormContainer,
    deadline: Option<Instant>,
}

impl SettingsPage {
    /// Load the section of `app` and render it clean.
    pub async fn load(ctx: Arc<ServiceContext>, app: AppType) -> CoreResult<Self> {
        let table = FieldTable::for_app_level(app).ok_or(CoreError::UnsupportedApp(app))?;
        ctx.cache.ensure_loaded(ctx.backend.as_ref()).await?;
        let source = ctx.cache.section(app).await.unwrap_or(Value::Null);

        let mut container = FormContainer::new();
        FormRenderer::render_table(&mut container, table.clone(), &source, None);
        let mut tracker = DirtyTracker::new();
        if let Some(form) = container.form() {
            tracker.set_baseline(form.snapshot());
        }

        Ok(Self {
            persister: SettingsPersister::new(Arc::clone(&ctx)),
            ctx,
            app,
            table,
            tracker,
            container,
            deadline: None,
        })
    }

    #[must_use]
    pub fn app(&self) -> AppType {
        self.app
    }

    #[must_use]
    pub fn container(&self) -> &FormContainer {
        &self.container
    }

    #[must_use]
    pub fn form(&self) -> Option<&Form> {
        self.container.form()
    }

    #[must_use]
    pub fn save_control(&self) -> SaveControl {
        self.container
            .form()
            .map(|form| self.tracker.evaluate(form))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.save_control().dirty
    }

    /// When the pending auto-save fires, if one is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()> {
        let form = self.container.form_mut().ok_or(CoreError::EditorClosed)?;
        form.set_text(key, value)?;
        self.after_input();
        Ok(())
    }

    pub fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        let form = self.container.form_mut().ok_or(CoreError::EditorClosed)?;
        form.set_checked(key, checked)?;
        self.after_input();
        Ok(())
    }

    fn after_input(&mut self) {
        self.deadline = if self.is_dirty() {
            Some(Instant::now() + self.ctx.config.auto_save_delay())
        } else {
            None
        };
    }

    /// Save if the auto-save timer has run out.
    ///
    /// Returns `true` when a save happened.
    pub async fn tick(&mut self) -> CoreResult<bool> {
        match self.deadline {
            Some(at) if Instant::now() >= at => {
                self.deadline = None;
                if !self.is_dirty() {
                    return Ok(false);
                }
                self.save_now().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Save immediately, cancelling any pending auto-save.
    ///
    /// Refused while the save control is disabled.
    pub async fn save_now(&mut self) -> CoreResult<Value> {
        self.deadline = None;
        self.save_control().ensure_enabled()?;
        let app = self.app;
        let (validation, values) = {
            let form = self.container.form().ok_or(CoreError::EditorClosed)?;
            (form.validate(), form.read_back())
        };
        if let Err(e) = validation {
            self.ctx.report_error(&format!("Saving {app} settings"), &e);
            return Err(e);
        }

        let payload = Value::Object(values);
        let container = &mut self.container;
        let table = self.table.clone();
        let saved = self
            .persister
            .save(app, &payload, &self.tracker, |saved| {
                FormRenderer::render_table(container, table, saved, None);
            })
            .await?;

        if let Some(form) = self.container.form() {
            self.tracker.set_baseline(form.snapshot());
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockSettingsBackend, create_test_context, sonarr_fixture};
    use arr_settings_api::ApiError;
    use std::time::Duration;

    async fn page() -> (SettingsPage, Arc<MockSettingsBackend>) {
        let (ctx, backend, _) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        let page = SettingsPage::load(ctx, AppType::General).await.unwrap();
        (page, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn loads_clean_with_stored_values() {
        let (page, _) = page().await;
        assert!(!page.is_dirty());
        assert_eq!(page.form().unwrap().text("log_level"), Some("DEBUG"));
        assert!(page.next_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_triggers_one_save() {
        let (mut page, backend) = page().await;
        page.set_text("log_level", "WARNING").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        page.set_checked("check_for_updates", false).unwrap();

        // Timer restarted by the second edit
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!page.tick().await.unwrap());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(page.tick().await.unwrap());
        assert_eq!(backend.save_count().await, 1);

        let (app, payload) = backend.last_save().await.unwrap();
        assert_eq!(app, AppType::General);
        assert_eq!(payload["log_level"], "WARNING");
        assert_eq!(payload["check_for_updates"], false);
        // Keys outside the table survive the round trip
        assert_eq!(payload["stateful_hours"], 168);

        assert!(!page.is_dirty());
        assert!(!page.tick().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_save_of_clean_page_sends_nothing() {
        let (mut page, backend) = page().await;
        assert!(matches!(page.save_now().await, Err(CoreError::NothingToSave)));

        page.set_text("log_level", "ERROR").unwrap();
        page.save_now().await.unwrap();
        assert!(matches!(page.save_now().await, Err(CoreError::NothingToSave)));
        assert_eq!(backend.save_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_the_edit_cancels_auto_save() {
        let (mut page, backend) = page().await;
        page.set_text("log_level", "ERROR").unwrap();
        assert!(page.next_deadline().is_some());
        page.set_text("log_level", "DEBUG").unwrap();
        assert!(page.next_deadline().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!page.tick().await.unwrap());
        assert_eq!(backend.save_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_auto_save_keeps_edits() {
        let (mut page, backend) = page().await;
        backend
            .set_save_error(Some(ApiError::NetworkError {
                endpoint: "POST /api/settings/general".to_string(),
                detail: "connection refused".to_string(),
            }))
            .await;
        page.set_text("base_url", "/huntarr").unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(page.tick().await.is_err());
        assert!(page.is_dirty());
        assert_eq!(page.form().unwrap().text("base_url"), Some("/huntarr"));

        // Saving again once the backend is back
        backend.set_save_error(None).await;
        page.save_now().await.unwrap();
        assert!(!page.is_dirty());
    }

    #[tokio::test]
    async fn instance_apps_have_no_app_level_page() {
        let (ctx, _, _) = create_test_context();
        assert!(matches!(
            SettingsPage::load(ctx, AppType::Sonarr).await,
            Err(CoreError::UnsupportedApp(AppType::Sonarr))
        ));
    }
}
