//! Connection probing
//!
//! Tests whether an instance or usenet server is reachable with the entered
//! credentials. Probes are debounced per entity and carry an explicit
//! timeout. Every scheduled probe takes a new generation number; a probe
//! whose generation is no longer current exits before its network call, and
//! a result that arrives after a newer probe started is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use arr_settings_api::log_sanitizer::is_masked;
use arr_settings_api::{AppType, SettingsBackend, TestConnectionRequest};

use crate::types::{
    ConnectionStatus, EditorConfig, EntityKey, EntityScope, Form, InstanceConfig, StatusEntry,
};

/// What to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// HTTP API of an *arr instance.
    Instance {
        app: AppType,
        api_url: String,
        /// Empty when left blank or masked.
        api_key: String,
        enabled: bool,
        api_timeout: Option<u64>,
        /// Position of the saved instance, if it exists yet.
        index: Option<usize>,
    },
    /// NNTP server of NZB Hunt.
    Server {
        host: String,
        port: u16,
        use_ssl: bool,
        username: String,
        /// `None` when left blank.
        password: Option<String>,
        /// Position of the saved server, if it exists yet.
        index: Option<usize>,
    },
}

impl ProbeTarget {
    /// Target for a saved instance. Masked keys count as blank.
    #[must_use]
    pub fn from_instance(app: AppType, instance: &InstanceConfig, index: Option<usize>) -> Self {
        Self::Instance {
            app,
            api_url: instance.api_url.trim().to_string(),
            api_key: unmasked(instance.api_key.as_deref().unwrap_or_default()),
            enabled: instance.enabled,
            api_timeout: instance.tuning.get("api_timeout").and_then(Value::as_u64),
            index,
        }
    }

    /// Target for an instance form; a blank key falls back to the stored one.
    #[must_use]
    pub fn from_instance_form(app: AppType, form: &Form, index: Option<usize>) -> Self {
        let values = form.read_back();
        let text = |key: &str| {
            values
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self::Instance {
            app,
            api_url: text("api_url"),
            api_key: unmasked(&text("api_key")),
            enabled: values.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            api_timeout: values.get("api_timeout").and_then(Value::as_u64),
            index,
        }
    }

    /// Target for a usenet server form.
    #[must_use]
    pub fn from_server_form(form: &Form, index: Option<usize>) -> Self {
        let values = form.read_back();
        Self::from_server_item(&Value::Object(values), index)
    }

    /// Target for a stored usenet server item. Masked passwords count as blank.
    #[must_use]
    pub fn from_server_item(item: &Value, index: Option<usize>) -> Self {
        let text = |key: &str| {
            item.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        let password = item
            .get("password")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty() && !is_masked(p))
            .map(str::to_string);
        Self::Server {
            host: text("host"),
            port: item
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(0),
            use_ssl: item.get("use_ssl").and_then(Value::as_bool).unwrap_or(true),
            username: text("username"),
            password,
            index,
        }
    }

    /// App whose test endpoint serves this target.
    #[must_use]
    pub fn app(&self) -> AppType {
        match self {
            Self::Instance { app, .. } => *app,
            Self::Server { .. } => AppType::NzbHunt,
        }
    }

    /// Request body for the backend.
    ///
    /// A blank key or password on a saved entity asks the backend to reuse
    /// the stored one instead of sending an empty credential.
    #[must_use]
    pub fn to_request(&self) -> TestConnectionRequest {
        match self {
            Self::Instance {
                api_url,
                api_key,
                api_timeout,
                index,
                ..
            } => {
                let (api_key, instance_index) = match index {
                    Some(i) if api_key.is_empty() => (None, Some(*i)),
                    _ => (Some(api_key.clone()), None),
                };
                TestConnectionRequest::Http {
                    api_url: api_url.clone(),
                    api_key,
                    api_timeout: *api_timeout,
                    instance_index,
                }
            }
            Self::Server {
                host,
                port,
                use_ssl,
                username,
                password,
                index,
            } => {
                let (password, server_index) = match (password, index) {
                    (Some(p), _) => (Some(p.clone()), None),
                    (None, Some(i)) => (None, Some(*i)),
                    (None, None) => (Some(String::new()), None),
                };
                TestConnectionRequest::Server {
                    host: host.clone(),
                    port: *port,
                    use_ssl: *use_ssl,
                    username: username.clone(),
                    password,
                    server_index,
                }
            }
        }
    }
}

fn unmasked(key: &str) -> String {
    let key = key.trim();
    if is_masked(key) {
        String::new()
    } else {
        key.to_string()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    entry: StatusEntry,
}

struct ProberInner {
    backend: Arc<dyn SettingsBackend>,
    debounce: Duration,
    timeout: Duration,
    min_key_len: usize,
    generations: AtomicU64,
    slots: Mutex<HashMap<EntityKey, Slot>>,
}

/// Debounced, per-entity connection prober. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionProber {
    inner: Arc<ProberInner>,
}

impl ConnectionProber {
    #[must_use]
    pub fn new(backend: Arc<dyn SettingsBackend>, config: &EditorConfig) -> Self {
        Self {
            inner: Arc::new(ProberInner {
                backend,
                debounce: config.probe_debounce(),
                timeout: config.probe_timeout(),
                min_key_len: config.min_api_key_len,
                generations: AtomicU64::new(0),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<EntityKey, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Status without a network call, when the target cannot or need not be
    /// probed.
    #[must_use]
    pub fn precheck(&self, target: &ProbeTarget) -> Option<ConnectionStatus> {
        let incomplete = |reason: &str| {
            Some(ConnectionStatus::Incomplete {
                reason: reason.to_string(),
            })
        };
        match target {
            ProbeTarget::Instance {
                api_url,
                api_key,
                enabled,
                index,
                ..
            } => {
                if !enabled {
                    return Some(ConnectionStatus::Disabled);
                }
                if api_url.trim().is_empty() {
                    return incomplete("Missing API URL");
                }
                let parsed = url::Url::parse(api_url.trim());
                if !parsed.is_ok_and(|u| matches!(u.scheme(), "http" | "https")) {
                    return incomplete("API URL must start with http:// or https://");
                }
                if api_key.trim().is_empty() {
                    // A saved instance keeps its stored key
                    return index.is_none().then(|| ConnectionStatus::Incomplete {
                        reason: "Missing API key".to_string(),
                    });
                }
                if api_key.trim().chars().count() < self.inner.min_key_len {
                    return incomplete("API key looks too short");
                }
                None
            }
            ProbeTarget::Server { host, port, .. } => {
                if host.trim().is_empty() {
                    return incomplete("Missing host");
                }
                if *port == 0 {
                    return incomplete("Missing port");
                }
                None
            }
        }
    }

    /// Probe a target once, without touching the status map. Never fails:
    /// transport errors and timeouts become [`ConnectionStatus::Error`].
    pub async fn test(&self, target: &ProbeTarget) -> ConnectionStatus {
        if let Some(status) = self.precheck(target) {
            return status;
        }
        self.remote(target).await
    }

    async fn remote(&self, target: &ProbeTarget) -> ConnectionStatus {
        let app = target.app();
        let request = target.to_request();
        log::debug!("Testing {app} connection");

        let call = self.inner.backend.test_connection(app, &request);
        match tokio::time::timeout(self.inner.timeout, call).await {
            Ok(Ok(response)) if response.success => ConnectionStatus::Connected {
                version: response.version,
            },
            Ok(Ok(response)) => {
                let message = response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Connection failed".to_string());
                log::warn!("{app} connection test failed: {message}");
                ConnectionStatus::Error { message }
            }
            Ok(Err(e)) => {
                if e.is_expected() {
                    log::warn!("{app} connection test failed: {e}");
                } else {
                    log::error!("{app} connection test failed: {e}");
                }
                ConnectionStatus::Error {
                    message: e.user_message(),
                }
            }
            Err(_) => {
                log::warn!(
                    "{app} connection test timed out after {:?}",
                    self.inner.timeout
                );
                ConnectionStatus::Error {
                    message: "Connection timed out".to_string(),
                }
            }
        }
    }

    /// Start a new probe generation for `key`, superseding earlier ones.
    fn begin(&self, key: EntityKey) -> u64 {
        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.slots().entry(key).or_default().generation = generation;
        generation
    }

    fn is_current(&self, key: EntityKey, generation: u64) -> bool {
        self.slots()
            .get(&key)
            .is_some_and(|slot| slot.generation == generation)
    }

    /// Store `status` if `generation` is still current. Returns whether it was stored.
    fn store(&self, key: EntityKey, generation: u64, status: ConnectionStatus) -> bool {
        let mut slots = self.slots();
        match slots.get_mut(&key) {
            Some(slot) if slot.generation == generation => {
                let resolved = !matches!(status, ConnectionStatus::Checking);
                slot.entry = StatusEntry {
                    status,
                    checked_at: resolved.then(Utc::now),
                };
                true
            }
            _ => {
                log::debug!("Dropping stale probe result for {key}");
                false
            }
        }
    }

    /// Debounced probe: runs once input for `key` has been quiet for the
    /// debounce delay. Missing credentials resolve immediately.
    pub fn schedule(&self, key: EntityKey, target: ProbeTarget) {
        let generation = self.begin(key);
        if let Some(status) = self.precheck(&target) {
            self.store(key, generation, status);
            return;
        }

        let prober = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(prober.inner.debounce).await;
            if !prober.is_current(key, generation) {
                return;
            }
            prober.store(key, generation, ConnectionStatus::Checking);
            let status = prober.remote(&target).await;
            prober.store(key, generation, status);
        });
    }

    /// Probe immediately, record and return the result.
    ///
    /// Supersedes any pending debounced probe of the same entity.
    pub async fn probe_now(&self, key: EntityKey, target: &ProbeTarget) -> ConnectionStatus {
        let generation = self.begin(key);
        if let Some(status) = self.precheck(target) {
            self.store(key, generation, status.clone());
            return status;
        }
        self.store(key, generation, ConnectionStatus::Checking);
        let status = self.remote(target).await;
        self.store(key, generation, status.clone());
        status
    }

    /// Probe many entities concurrently.
    pub async fn probe_all(
        &self,
        targets: Vec<(EntityKey, ProbeTarget)>,
    ) -> Vec<(EntityKey, ConnectionStatus)> {
        let probes = targets.iter().map(|(key, target)| async move {
            (*key, self.probe_now(*key, target).await)
        });
        futures::future::join_all(probes).await
    }

    #[must_use]
    pub fn status(&self, key: EntityKey) -> ConnectionStatus {
        self.entry(key).status
    }

    #[must_use]
    pub fn entry(&self, key: EntityKey) -> StatusEntry {
        self.slots()
            .get(&key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_default()
    }

    /// Statuses of saved entities in `scope`, by position.
    #[must_use]
    pub fn statuses(&self, scope: EntityScope) -> Vec<(usize, ConnectionStatus)> {
        let mut out: Vec<_> = self
            .slots()
            .iter()
            .filter(|(k, _)| k.scope == scope)
            .filter_map(|(k, slot)| k.index.map(|i| (i, slot.entry.status.clone())))
            .collect();
        out.sort_by_key(|(i, _)| *i);
        out
    }

    /// Drop the status of `key`; in-flight results for it are discarded.
    pub fn forget(&self, key: EntityKey) {
        self.slots().remove(&key);
    }

    /// Move the status of `from` to `to` (a new entity that got its index).
    pub fn rekey(&self, from: EntityKey, to: EntityKey) {
        let mut slots = self.slots();
        if let Some(slot) = slots.remove(&from) {
            slots.insert(to, slot);
        }
    }

    /// Follow a delete: drop the deleted entity and shift later ones down.
    ///
    /// Shifted entries keep their status but in-flight probes for the old
    /// positions are discarded.
    pub fn remove_and_shift(&self, scope: EntityScope, deleted: usize) {
        let mut slots = self.slots();
        let keys: Vec<EntityKey> = slots
            .keys()
            .filter(|k| k.scope == scope && k.index.is_some_and(|i| i >= deleted))
            .copied()
            .collect();
        let mut moved = Vec::new();
        for key in keys {
            let Some(mut slot) = slots.remove(&key) else {
                continue;
            };
            let Some(index) = key.index else { continue };
            if index == deleted {
                continue;
            }
            if slot.entry.status == ConnectionStatus::Checking {
                slot.entry = StatusEntry::default();
            }
            moved.push((
                EntityKey {
                    scope,
                    index: Some(index - 1),
                },
                slot,
            ));
        }
        slots.extend(moved);
    }
}
