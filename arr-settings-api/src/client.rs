//! reqwest-backed implementation of [`SettingsBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http_client::HttpUtils;
use crate::traits::SettingsBackend;
use crate::types::{
    AppType, Collection, ServerSettings, TestConnectionRequest, TestConnectionResponse,
};

/// Default dashboard address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9705";

/// Connection settings for [`HttpSettingsBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Dashboard base URL, optionally with a path prefix (`http://host/huntarr`).
    pub base_url: String,
    /// Timeout for regular requests, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for connection tests, in seconds.
    pub probe_timeout_secs: u64,
    /// Retries for idempotent reads. Writes are never retried.
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            max_retries: 2,
        }
    }
}

/// Settings backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSettingsBackend {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
    max_retries: u32,
}

impl HttpSettingsBackend {
    /// Build a backend from its configuration.
    ///
    /// Fails with [`ApiError::InvalidRequest`] when the base URL is not an
    /// absolute http(s) URL.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let parsed = url::Url::parse(config.base_url.trim()).map_err(|e| invalid_base(&e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidRequest {
                endpoint: "client".to_string(),
                detail: format!("Unsupported URL scheme: {}", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::InvalidRequest {
                endpoint: "client".to_string(),
                detail: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            max_retries: config.max_retries,
        })
    }

    /// Normalized base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let endpoint = format!("{method} {path}");
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json");
        (builder, endpoint)
    }

    async fn send_json(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        idempotent: bool,
    ) -> Result<Value> {
        let (status, body) = if idempotent {
            HttpUtils::execute_request_with_retry(builder, endpoint, self.max_retries).await?
        } else {
            HttpUtils::execute_request(builder, endpoint).await?
        };
        HttpUtils::ensure_success(status, &body, endpoint)?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        HttpUtils::parse_json(&body, endpoint)
    }
}

fn invalid_base(err: &url::ParseError) -> ApiError {
    ApiError::InvalidRequest {
        endpoint: "client".to_string(),
        detail: format!("Invalid base URL: {err}"),
    }
}

fn body_of<T: Serialize>(value: &T, endpoint: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ApiError::SerializationError {
        endpoint: endpoint.to_string(),
        detail: e.to_string(),
    })
}

/// Pull the canonical section out of a save response.
///
/// Accepts the bare section, a `{"settings": {...}}` wrapper, or a bare
/// `{"success": true}` acknowledgement (in which case the sent payload is
/// the canonical copy).
fn canonical_section(response: Value, sent: &Value) -> Value {
    match response {
        Value::Object(mut map) => {
            if let Some(section @ Value::Object(_)) = map.remove("settings") {
                return section;
            }
            let ack_only = map.keys().all(|k| k == "success" || k == "message");
            if ack_only {
                sent.clone()
            } else {
                Value::Object(map)
            }
        }
        Value::Null => sent.clone(),
        other => other,
    }
}

/// Pull the stored item out of a create/update response.
fn canonical_item(response: Value, collection: Collection, sent: &Value) -> Value {
    match response {
        Value::Object(mut map) => {
            if let Some(item @ Value::Object(_)) = map.remove(collection.item_label()) {
                return item;
            }
            let ack_only = map.keys().all(|k| k == "success" || k == "message" || k == "index");
            if ack_only {
                sent.clone()
            } else {
                Value::Object(map)
            }
        }
        Value::Null => sent.clone(),
        other => other,
    }
}

fn list_of(response: Value, collection: Collection, endpoint: &str) -> Result<Vec<Value>> {
    match response {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(collection.list_key()) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::ParseError {
                endpoint: endpoint.to_string(),
                detail: format!("Missing '{}' list in response", collection.list_key()),
            }),
        },
        _ => Err(ApiError::ParseError {
            endpoint: endpoint.to_string(),
            detail: "Expected a JSON list".to_string(),
        }),
    }
}

#[async_trait]
impl SettingsBackend for HttpSettingsBackend {
    async fn fetch_settings(&self) -> Result<ServerSettings> {
        let (builder, endpoint) = self.request(Method::GET, "/api/settings");
        let value = self.send_json(builder, &endpoint, true).await?;
        match value {
            Value::Object(map) => Ok(ServerSettings::new(map)),
            _ => Err(ApiError::ParseError {
                endpoint,
                detail: "Expected a settings object".to_string(),
            }),
        }
    }

    async fn save_settings(&self, app: AppType, settings: &Value) -> Result<Value> {
        let path = format!("/api/settings/{}", app.as_str());
        let (builder, endpoint) = self.request(Method::POST, &path);
        let body = body_of(settings, &endpoint)?;
        let builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        log::info!("Saving {app} settings");
        let response = self.send_json(builder, &endpoint, false).await?;
        Ok(canonical_section(response, settings))
    }

    async fn test_connection(
        &self,
        app: AppType,
        request: &TestConnectionRequest,
    ) -> Result<TestConnectionResponse> {
        let path = format!("/api/{}/test-connection", app.path_segment());
        let (builder, endpoint) = self.request(Method::POST, &path);
        let body = body_of(request, &endpoint)?;
        let builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.probe_timeout)
            .body(body);

        let (status, text) = HttpUtils::execute_request(builder, &endpoint).await?;

        // A failed probe is reported in the body, often with a 4xx/5xx status
        if let Ok(parsed) = serde_json::from_str::<TestConnectionResponse>(&text)
            && (!parsed.success || (200..300).contains(&status))
        {
            return Ok(parsed);
        }
        HttpUtils::ensure_success(status, &text, &endpoint)?;
        HttpUtils::parse_json(&text, &endpoint)
    }

    async fn list_items(&self, collection: Collection) -> Result<Vec<Value>> {
        let (builder, endpoint) = self.request(Method::GET, collection.path());
        let value = self.send_json(builder, &endpoint, true).await?;
        list_of(value, collection, &endpoint)
    }

    async fn create_item(&self, collection: Collection, item: &Value) -> Result<Value> {
        let (builder, endpoint) = self.request(Method::POST, collection.path());
        let body = body_of(item, &endpoint)?;
        let builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.send_json(builder, &endpoint, false).await?;
        Ok(canonical_item(response, collection, item))
    }

    async fn update_item(
        &self,
        collection: Collection,
        index: usize,
        item: &Value,
    ) -> Result<Value> {
        let path = format!("{}/{index}", collection.path());
        let (builder, endpoint) = self.request(Method::PUT, &path);
        let body = body_of(item, &endpoint)?;
        let builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.send_json(builder, &endpoint, false).await?;
        Ok(canonical_item(response, collection, item))
    }

    async fn delete_item(&self, collection: Collection, index: usize) -> Result<()> {
        let path = format!("{}/{index}", collection.path());
        let (builder, endpoint) = self.request(Method::DELETE, &path);
        self.send_json(builder, &endpoint, false).await?;
        Ok(())
    }
}
