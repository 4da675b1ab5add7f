//! Instance CRUD without a form
//!
//! Adds, patches and deletes instances through the app settings endpoint.
//! Positions stay densely packed; position 0 is the default instance.

use std::sync::Arc;

use serde_json::{Map, Value};

use arr_settings_api::AppType;

use crate::error::{CoreError, CoreResult};
use crate::services::{ConnectionProber, FormRenderer, ProbeTarget, ServiceContext};
use crate::types::{AppSettings, ConnectionStatus, EntityKey, EntityScope, InstanceConfig};

/// Instance service
pub struct InstanceService {
    ctx: Arc<ServiceContext>,
    prober: ConnectionProber,
}

impl InstanceService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, prober: ConnectionProber) -> Self {
        Self { ctx, prober }
    }

    async fn load(&self, app: AppType) -> CoreResult<AppSettings> {
        if !app.has_instances() {
            return Err(CoreError::UnsupportedApp(app));
        }
        self.ctx
            .cache
            .ensure_loaded(self.ctx.backend.as_ref())
            .await?;
        self.ctx.cache.app_settings(app).await
    }

    async fn persist(&self, app: AppType, settings: &AppSettings) -> CoreResult<AppSettings> {
        let payload = settings.to_payload()?;
        let saved = match self.ctx.backend.save_settings(app, &payload).await {
            Ok(saved) => saved,
            Err(e) => {
                let err = CoreError::from(e);
                self.ctx.report_error(&format!("Saving {app} instances"), &err);
                return Err(err);
            }
        };
        let parsed = AppSettings::from_value(&saved)?;
        self.ctx.cache.replace(app, saved).await;
        Ok(parsed)
    }

    /// Instances of `app`, in order.
    pub async fn list(&self, app: AppType) -> CoreResult<Vec<InstanceConfig>> {
        Ok(self.load(app).await?.instances)
    }

    /// Append an instance, filling every missing field with its default.
    ///
    /// Returns the new position.
    pub async fn add(&self, app: AppType, fields: Map<String, Value>) -> CoreResult<usize> {
        let mut settings = self.load(app).await?;
        let form = FormRenderer::build_form(FormRenderer::table_for(app), &Value::Object(fields))?;
        form.validate()?;
        settings
            .instances
            .push(InstanceConfig::from_value(&Value::Object(form.read_back()))?);

        let saved = self.persist(app, &settings).await?;
        let index = saved.instances.len().saturating_sub(1);
        log::info!("Added {app} instance #{index}");
        Ok(index)
    }

    /// Overwrite some fields of instance `index`.
    pub async fn update(
        &self,
        app: AppType,
        index: usize,
        patch: Map<String, Value>,
    ) -> CoreResult<InstanceConfig> {
        let mut settings = self.load(app).await?;
        let current = settings
            .instance(index)
            .ok_or(CoreError::InstanceNotFound { app, index })?
            .to_value()?;

        let mut merged = match current {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(patch);
        let form = FormRenderer::build_form(FormRenderer::table_for(app), &Value::Object(merged))?;
        form.validate()?;
        settings.instances[index] = InstanceConfig::from_value(&Value::Object(form.read_back()))?;

        let saved = self.persist(app, &settings).await?;
        saved
            .instances
            .get(index)
            .cloned()
            .ok_or(CoreError::InstanceNotFound { app, index })
    }

    /// Remove instance `index`; later instances shift down by one and the
    /// next one becomes the default if `index` was 0.
    pub async fn delete(&self, app: AppType, index: usize) -> CoreResult<InstanceConfig> {
        let mut settings = self.load(app).await?;
        if index >= settings.instances.len() {
            return Err(CoreError::InstanceNotFound { app, index });
        }
        let removed = settings.instances.remove(index);
        self.persist(app, &settings).await?;
        self.prober.remove_and_shift(EntityScope::App(app), index);
        log::info!("Deleted {app} instance #{index} ({})", removed.name);
        Ok(removed)
    }

    /// Probe every instance of `app` concurrently.
    pub async fn refresh_statuses(
        &self,
        app: AppType,
    ) -> CoreResult<Vec<(usize, ConnectionStatus)>> {
        let settings = self.load(app).await?;
        let targets = settings
            .instances
            .iter()
            .enumerate()
            .map(|(i, instance)| {
                (
                    EntityKey::instance(app, Some(i)),
                    ProbeTarget::from_instance(app, instance, Some(i)),
                )
            })
            .collect();
        let results = self.prober.probe_all(targets).await;
        Ok(results
            .into_iter()
            .filter_map(|(key, status)| key.index.map(|i| (i, status)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{GOOD_KEY, MockSettingsBackend, create_test_context, sonarr_fixture};
    use serde_json::json;

    async fn service() -> (InstanceService, Arc<ServiceContext>, Arc<MockSettingsBackend>) {
        let (ctx, backend, _) = create_test_context();
        backend.replace_settings(sonarr_fixture()).await;
        let prober = ConnectionProber::new(ctx.backend.clone(), &ctx.config);
        (InstanceService::new(ctx.clone(), prober), ctx, backend)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn delete_first_makes_second_the_default() {
        let (svc, _, _) = service().await;
        let statuses = svc.refresh_statuses(AppType::Sonarr).await.unwrap();
        assert_eq!(statuses.len(), 3);

        let removed = svc.delete(AppType::Sonarr, 0).await.unwrap();
        assert_eq!(removed.name, "Main");

        let instances = svc.list(AppType::Sonarr).await.unwrap();
        let names: Vec<_> = instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "Third"]);
        assert!(AppSettings::is_default(0));

        // Statuses moved with their instances
        let statuses = svc.prober.statuses(EntityScope::App(AppType::Sonarr));
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].1.is_connected());
        assert!(matches!(statuses[1].1, ConnectionStatus::Error { .. }));
    }

    #[tokio::test]
    async fn delete_out_of_range_is_not_found() {
        let (svc, _, backend) = service().await;
        assert!(matches!(
            svc.delete(AppType::Sonarr, 3).await,
            Err(CoreError::InstanceNotFound { index: 3, .. })
        ));
        assert_eq!(backend.save_count().await, 0);
    }

    #[tokio::test]
    async fn add_fills_defaults_and_appends() {
        let (svc, ctx, _) = service().await;
        let index = svc
            .add(
                AppType::Sonarr,
                object(json!({"name": "Added", "api_url": "http://added:8989", "api_key": GOOD_KEY})),
            )
            .await
            .unwrap();
        assert_eq!(index, 3);

        let cached = ctx.cache.app_settings(AppType::Sonarr).await.unwrap();
        let added = &cached.instances[3];
        assert_eq!(added.api_key.as_deref(), Some(GOOD_KEY));
        assert_eq!(added.tuning["hourly_cap"], 20);
        assert_eq!(added.tuning["hunt_missing_mode"], "seasons_packs");
    }

    #[tokio::test]
    async fn add_without_url_fails_validation() {
        let (svc, _, backend) = service().await;
        let result = svc
            .add(AppType::Sonarr, object(json!({"name": "No URL"})))
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(backend.save_count().await, 0);
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let (svc, _, _) = service().await;
        let updated = svc
            .update(
                AppType::Sonarr,
                1,
                object(json!({"hourly_cap": 999, "enabled": false})),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Second");
        assert!(!updated.enabled);
        // Clamped into range
        assert_eq!(updated.tuning["hourly_cap"], 400);
        assert_eq!(updated.api_key.as_deref(), Some(GOOD_KEY));
    }

    #[tokio::test]
    async fn masked_keys_probe_and_persist_through_the_backend() {
        let (svc, _, backend) = service().await;
        backend.mask_api_keys();

        let statuses = svc.refresh_statuses(AppType::Sonarr).await.unwrap();
        assert!(statuses[0].1.is_connected());
        assert!(statuses[1].1.is_connected());
        assert!(matches!(statuses[2].1, ConnectionStatus::Error { .. }));

        svc.update(AppType::Sonarr, 2, object(json!({"name": "Attic"})))
            .await
            .unwrap();
        let (_, payload) = backend.last_save().await.unwrap();
        assert!(
            payload["instances"]
                .as_array()
                .unwrap()
                .iter()
                .all(|i| i.get("api_key").is_none())
        );
        assert_eq!(
            backend.stored_key(AppType::Sonarr, 0).await.as_deref(),
            Some(GOOD_KEY)
        );
    }

    #[tokio::test]
    async fn general_has_no_instances() {
        let (svc, _, _) = service().await;
        assert!(matches!(
            svc.list(AppType::General).await,
            Err(CoreError::UnsupportedApp(AppType::General))
        ));
    }
}
