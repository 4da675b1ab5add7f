//! In-memory mirror of the backend settings document

use tokio::sync::RwLock;

use arr_settings_api::{AppType, ServerSettings, SettingsBackend};
use serde_json::Value;

use crate::error::CoreResult;
use crate::types::AppSettings;

/// Last known settings, keyed by app type.
///
/// Replaced section by section from the server's copy after every save.
#[derive(Debug, Default)]
pub struct SettingsCache {
    inner: RwLock<Option<ServerSettings>>,
}

impl SettingsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the whole document from the backend.
    pub async fn load(&self, backend: &dyn SettingsBackend) -> CoreResult<()> {
        let settings = backend.fetch_settings().await?;
        log::debug!("Loaded settings for {:?}", settings.apps());
        *self.inner.write().await = Some(settings);
        Ok(())
    }

    /// Fetch only if nothing has been loaded yet.
    pub async fn ensure_loaded(&self, backend: &dyn SettingsBackend) -> CoreResult<()> {
        if self.is_loaded().await {
            return Ok(());
        }
        self.load(backend).await
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Raw section of one app.
    pub async fn section(&self, app: AppType) -> Option<Value> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|s| s.get(app).cloned())
    }

    /// Typed section of one app; missing sections are empty.
    pub async fn app_settings(&self, app: AppType) -> CoreResult<AppSettings> {
        match self.section(app).await {
            Some(value) => AppSettings::from_value(&value),
            None => Ok(AppSettings::default()),
        }
    }

    /// Replace one section with the server's copy.
    pub async fn replace(&self, app: AppType, section: Value) {
        let mut guard = self.inner.write().await;
        guard.get_or_insert_with(ServerSettings::default).insert(app, section);
    }
}
