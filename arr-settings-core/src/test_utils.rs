//! Test helpers
//!
//! Mock implementations and convenience factories.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use arr_settings_api::log_sanitizer::SECRET_MASK;
use arr_settings_api::{
    ApiError, AppType, Collection, Result as ApiResult, ServerSettings, SettingsBackend,
    TestConnectionRequest, TestConnectionResponse,
};

use crate::services::ServiceContext;
use crate::traits::{DiscardConfirmer, Notifier};
use crate::types::{EditorConfig, EditorSession, Notification};

/// The only API key the mock backend accepts.
pub const GOOD_KEY: &str = "0123456789abcdef0123456789abcdef";

// ===== MockSettingsBackend =====

pub struct MockSettingsBackend {
    settings: RwLock<Map<String, Value>>,
    items: RwLock<HashMap<Collection, Vec<Value>>>,
    fetches: AtomicUsize,
    saves: RwLock<Vec<(AppType, Value)>>,
    /// If Some, every save fails with this error
    save_error: RwLock<Option<ApiError>>,
    probes: RwLock<Vec<TestConnectionRequest>>,
    probe_delays: RwLock<HashMap<String, Duration>>,
    /// Answer reads with masked instance keys, like the real dashboard
    mask_keys: AtomicBool,
}

impl MockSettingsBackend {
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(Map::new()),
            items: RwLock::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            saves: RwLock::new(Vec::new()),
            save_error: RwLock::new(None),
            probes: RwLock::new(Vec::new()),
            probe_delays: RwLock::new(HashMap::new()),
            mask_keys: AtomicBool::new(false),
        }
    }

    /// Stop echoing instance keys; fetches and save answers carry masks.
    pub fn mask_api_keys(&self) {
        self.mask_keys.store(true, Ordering::SeqCst);
    }

    fn masked(&self, mut section: Value) -> Value {
        if !self.mask_keys.load(Ordering::SeqCst) {
            return section;
        }
        if let Some(instances) = section.get_mut("instances").and_then(Value::as_array_mut) {
            for instance in instances.iter_mut().filter_map(Value::as_object_mut) {
                let has_key = instance
                    .get("api_key")
                    .and_then(Value::as_str)
                    .is_some_and(|k| !k.is_empty());
                if has_key {
                    instance.insert("api_key".to_string(), json!(SECRET_MASK));
                }
            }
        }
        section
    }

    /// Key stored for instance `index` of `app`.
    pub async fn stored_key(&self, app: AppType, index: usize) -> Option<String> {
        self.settings
            .read()
            .await
            .get(app.as_str())
            .and_then(|section| section.get("instances"))
            .and_then(|list| list.get(index))
            .and_then(|instance| instance.get("api_key"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn with_settings(settings: Value) -> Self {
        let backend = Self::new();
        if let Value::Object(map) = settings {
            backend.settings.try_write().unwrap().extend(map);
        }
        backend
    }

    pub async fn replace_settings(&self, settings: Value) {
        let map = match settings {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        *self.settings.write().await = map;
    }

    pub async fn replace_items(&self, collection: Collection, items: Vec<Value>) {
        self.items.write().await.insert(collection, items);
    }

    pub async fn items(&self, collection: Collection) -> Vec<Value> {
        self.items
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn set_save_error(&self, err: Option<ApiError>) {
        *self.save_error.write().await = err;
    }

    pub async fn last_save(&self) -> Option<(AppType, Value)> {
        self.saves.read().await.last().cloned()
    }

    pub async fn save_count(&self) -> usize {
        self.saves.read().await.len()
    }

    pub async fn probe_requests(&self) -> Vec<TestConnectionRequest> {
        self.probes.read().await.clone()
    }

    /// Delay answers to probes made with `api_key`.
    pub async fn set_probe_delay(&self, api_key: &str, delay: Duration) {
        self.probe_delays
            .write()
            .await
            .insert(api_key.to_string(), delay);
    }

    fn not_found(collection: Collection, index: usize) -> ApiError {
        ApiError::NotFound {
            endpoint: format!("{}/{index}", collection.path()),
            raw_message: Some(format!("No {} at index {index}", collection.item_label())),
        }
    }
}

#[async_trait]
impl SettingsBackend for MockSettingsBackend {
    async fn fetch_settings(&self) -> ApiResult<ServerSettings> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let sections = self
            .settings
            .read()
            .await
            .iter()
            .map(|(app, section)| (app.clone(), self.masked(section.clone())))
            .collect();
        Ok(ServerSettings::new(sections))
    }

    async fn save_settings(&self, app: AppType, settings: &Value) -> ApiResult<Value> {
        if let Some(err) = self.save_error.read().await.clone() {
            return Err(err);
        }
        self.saves.write().await.push((app, settings.clone()));

        // An omitted key keeps the one stored at the same position
        let mut stored = settings.clone();
        let mut all = self.settings.write().await;
        let previous = all.get(app.as_str()).cloned().unwrap_or(Value::Null);
        if let Some(instances) = stored.get_mut("instances").and_then(Value::as_array_mut) {
            for (i, instance) in instances.iter_mut().enumerate() {
                let kept = previous["instances"][i].get("api_key").cloned();
                if let (Some(map), Some(kept)) = (instance.as_object_mut(), kept)
                    && !map.contains_key("api_key")
                {
                    map.insert("api_key".to_string(), kept);
                }
            }
        }
        all.insert(app.as_str().to_string(), stored.clone());
        Ok(self.masked(stored))
    }

    async fn test_connection(
        &self,
        app: AppType,
        request: &TestConnectionRequest,
    ) -> ApiResult<TestConnectionResponse> {
        self.probes.write().await.push(request.clone());
        match request {
            TestConnectionRequest::Http {
                api_key,
                instance_index,
                ..
            } => {
                let key = match (api_key, instance_index) {
                    (Some(key), _) => key.clone(),
                    (None, Some(i)) => self.stored_key(app, *i).await.unwrap_or_default(),
                    (None, None) => String::new(),
                };
                let delay = self.probe_delays.read().await.get(&key).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if key == GOOD_KEY {
                    Ok(TestConnectionResponse {
                        success: true,
                        message: None,
                        version: Some("4.0.1".to_string()),
                    })
                } else {
                    Ok(TestConnectionResponse {
                        success: false,
                        message: Some("Invalid API key".to_string()),
                        version: None,
                    })
                }
            }
            TestConnectionRequest::Server {
                password,
                server_index,
                ..
            } => Ok(TestConnectionResponse {
                success: password.is_some() || server_index.is_some(),
                message: Some("Authentication required".to_string())
                    .filter(|_| password.is_none() && server_index.is_none()),
                version: None,
            }),
        }
    }

    async fn list_items(&self, collection: Collection) -> ApiResult<Vec<Value>> {
        Ok(self.items(collection).await)
    }

    async fn create_item(&self, collection: Collection, item: &Value) -> ApiResult<Value> {
        self.items
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(item.clone());
        Ok(item.clone())
    }

    async fn update_item(
        &self,
        collection: Collection,
        index: usize,
        item: &Value,
    ) -> ApiResult<Value> {
        let mut items = self.items.write().await;
        let slot = items
            .get_mut(&collection)
            .and_then(|list| list.get_mut(index))
            .ok_or_else(|| Self::not_found(collection, index))?;
        *slot = item.clone();
        Ok(item.clone())
    }

    async fn delete_item(&self, collection: Collection, index: usize) -> ApiResult<()> {
        let mut items = self.items.write().await;
        match items.get_mut(&collection) {
            Some(list) if index < list.len() => {
                list.remove(index);
                Ok(())
            }
            _ => Err(Self::not_found(collection, index)),
        }
    }
}

// ===== RecordingNotifier =====

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

// ===== ScriptedConfirmer =====

pub struct ScriptedConfirmer {
    answer: Mutex<bool>,
    calls: AtomicUsize,
}

impl ScriptedConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer: Mutex::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_answer(&self, answer: bool) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscardConfirmer for ScriptedConfirmer {
    async fn confirm_discard(&self, _session: &EditorSession) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.answer.lock().unwrap()
    }
}

// ===== Factories =====

/// Create a `ServiceContext` over a fresh mock backend
pub fn create_test_context() -> (
    Arc<ServiceContext>,
    Arc<MockSettingsBackend>,
    Arc<RecordingNotifier>,
) {
    let backend = Arc::new(MockSettingsBackend::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = Arc::new(ServiceContext::new(
        backend.clone(),
        notifier.clone(),
        EditorConfig::default(),
    ));
    (ctx, backend, notifier)
}

/// Three Sonarr instances (the third with a rejected key) plus general settings.
pub fn sonarr_fixture() -> Value {
    json!({
        "sonarr": {
            "instances": [
                {
                    "name": "Main",
                    "api_url": "http://localhost:8989",
                    "api_key": GOOD_KEY,
                    "enabled": true
                },
                {
                    "name": "Second",
                    "api_url": "http://second:8989",
                    "api_key": GOOD_KEY,
                    "enabled": true,
                    "hourly_cap": 50
                },
                {
                    "name": "Third",
                    "api_url": "http://third:8989",
                    "api_key": "dddddddddddddddddddddddddddddddd",
                    "enabled": true
                }
            ]
        },
        "general": {
            "log_level": "DEBUG",
            "check_for_updates": true,
            "ssl_verify": true,
            "base_url": "",
            "auth_mode": "login",
            "api_timeout": 120,
            "stateful_hours": 168
        }
    })
}
