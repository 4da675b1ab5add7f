//! Settings persistence
//!
//! POSTs one settings section and reconciles with the server's copy. Change
//! detection stays suspended for the whole round trip plus a settling delay
//! after the repaint, so the repaint itself never marks the form dirty.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use arr_settings_api::AppType;
use arr_settings_api::log_sanitizer::truncate_for_log;

use crate::error::{CoreError, CoreResult};
use crate::services::{DirtyTracker, ServiceContext};
use crate::types::Notification;

/// Saves settings sections and feeds the server copy back.
pub struct SettingsPersister {
    ctx: Arc<ServiceContext>,
    settle: Duration,
}

impl SettingsPersister {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        let settle = ctx.config.settle_delay();
        Self { ctx, settle }
    }

    /// Save `payload` as the `app` section.
    ///
    /// On success the cached section is replaced by the server's copy,
    /// `repaint` is called with that copy, and the server copy is returned
    /// once the settling delay has passed. On failure the cache is left
    /// untouched, the user is notified and the error is returned. Either
    /// way change detection on `tracker` is resumed before returning.
    pub async fn save<F>(
        &self,
        app: AppType,
        payload: &Value,
        tracker: &DirtyTracker,
        repaint: F,
    ) -> CoreResult<Value>
    where
        F: FnOnce(&Value),
    {
        let _guard = tracker.suspend();
        log::debug!(
            "Saving {app} settings: {}",
            truncate_for_log(&redacted(payload).to_string())
        );

        let saved = match self.ctx.backend.save_settings(app, payload).await {
            Ok(saved) => saved,
            Err(e) => {
                let err = CoreError::from(e);
                self.ctx
                    .report_error(&format!("Saving {app} settings failed"), &err);
                return Err(err);
            }
        };

        self.ctx.cache.replace(app, saved.clone()).await;
        repaint(&saved);
        tokio::time::sleep(self.settle).await;

        log::info!("{app} settings saved");
        self.ctx.notifier.notify(Notification::success(format!(
            "{} settings saved",
            app.display_name()
        )));
        Ok(saved)
    }
}

/// Copy of a settings payload with secrets blanked, for logging.
fn redacted(payload: &Value) -> Value {
    const SECRET_KEYS: [&str; 2] = ["api_key", "password"];
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if SECRET_KEYS.contains(&k.as_str()) && v.is_string() {
                        Value::String("***".to_string())
                    } else {
                        redacted(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, sonarr_fixture};
    use crate::types::NotificationLevel;
    use arr_settings_api::ApiError;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn success_replaces_cache_and_repaints_while_suspended() {
        let (ctx, backend, notifier) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        ctx.cache.load(ctx.backend.as_ref()).await.unwrap();
        let persister = SettingsPersister::new(ctx.clone());
        let tracker = DirtyTracker::new();

        let payload = json!({"instances": [{"name": "Solo", "api_url": "http://solo:8989"}]});
        let repainted = AtomicBool::new(false);
        let saved = persister
            .save(AppType::Sonarr, &payload, &tracker, |copy| {
                assert!(tracker.is_suspended());
                assert_eq!(copy["instances"][0]["name"], "Solo");
                repainted.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert!(repainted.load(Ordering::SeqCst));
        assert!(!tracker.is_suspended());
        assert_eq!(saved["instances"][0]["name"], "Solo");
        let cached = ctx.cache.app_settings(AppType::Sonarr).await.unwrap();
        assert_eq!(cached.instances.len(), 1);
        assert_eq!(notifier.last().unwrap().level, NotificationLevel::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_cache_and_releases_suspension() {
        let (ctx, backend, notifier) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        ctx.cache.load(ctx.backend.as_ref()).await.unwrap();
        backend
            .set_save_error(Some(ApiError::ServerRejected {
                endpoint: "POST /api/settings/sonarr".to_string(),
                status: 400,
                message: "API URL is required".to_string(),
            }))
            .await;
        let persister = SettingsPersister::new(ctx.clone());
        let tracker = DirtyTracker::new();

        let result = persister
            .save(AppType::Sonarr, &json!({"instances": []}), &tracker, |_| {
                panic!("must not repaint on failure")
            })
            .await;

        assert!(result.is_err());
        assert!(!tracker.is_suspended());
        let cached = ctx.cache.app_settings(AppType::Sonarr).await.unwrap();
        assert_eq!(cached.instances.len(), 3);
        let last = notifier.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.message, "API URL is required");
    }

    #[test]
    fn redaction_hides_nested_secrets() {
        let payload = json!({"instances": [{"name": "A", "api_key": "secret"}], "password": "pw"});
        let out = redacted(&payload);
        assert_eq!(out["instances"][0]["api_key"], "***");
        assert_eq!(out["instances"][0]["name"], "A");
        assert_eq!(out["password"], "***");
    }
}
