//! In-process fake dashboard used by the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use arr_settings_api::{ClientConfig, HttpSettingsBackend, TestConnectionRequest};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

/// API key the fake dashboard accepts.
pub const GOOD_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Assert a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Mutable state behind the fake routes.
#[derive(Default)]
pub struct FakeDashboard {
    pub settings: Mutex<Map<String, Value>>,
    pub servers: Mutex<Vec<Value>>,
    pub last_probe: Mutex<Option<TestConnectionRequest>>,
    /// Number of upcoming `GET /api/settings` calls answered with 503.
    pub fetch_failures: AtomicU32,
    pub fetch_calls: AtomicU32,
}

impl FakeDashboard {
    pub fn with_settings(settings: Value) -> Arc<Self> {
        let Value::Object(map) = settings else {
            panic!("settings fixture must be an object");
        };
        Arc::new(Self {
            settings: Mutex::new(map),
            ..Self::default()
        })
    }
}

async fn get_settings(State(state): State<Arc<FakeDashboard>>) -> Response {
    state.fetch_calls.fetch_add(1, Ordering::SeqCst);
    if state.fetch_failures.load(Ordering::SeqCst) > 0 {
        state.fetch_failures.fetch_sub(1, Ordering::SeqCst);
        return (StatusCode::SERVICE_UNAVAILABLE, "warming up").into_response();
    }
    Json(Value::Object(state.settings.lock().await.clone())).into_response()
}

async fn save_settings(
    State(state): State<Arc<FakeDashboard>>,
    Path(app): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    let missing_url = body
        .get("instances")
        .and_then(Value::as_array)
        .is_some_and(|instances| {
            instances.iter().any(|i| {
                i.get("api_url")
                    .and_then(Value::as_str)
                    .is_none_or(|u| u.trim().is_empty())
            })
        });
    if missing_url {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "API URL is required"})),
        )
            .into_response();
    }

    // The backend derives fields the client never sends
    if app == "general" {
        if let Some(map) = body.as_object_mut() {
            map.insert("server_time_zone".to_string(), json!("UTC"));
        }
    }

    state.settings.lock().await.insert(app, body.clone());
    Json(json!({"success": true, "settings": body})).into_response()
}

async fn test_connection(
    State(state): State<Arc<FakeDashboard>>,
    Json(request): Json<TestConnectionRequest>,
) -> Response {
    let accepted = match &request {
        TestConnectionRequest::Http {
            api_key,
            instance_index,
            ..
        } => {
            api_key.as_deref() == Some(GOOD_KEY)
                || (api_key.is_none() && instance_index.is_some())
        }
        TestConnectionRequest::Server {
            password,
            server_index,
            ..
        } => password.is_some() || server_index.is_some(),
    };
    *state.last_probe.lock().await = Some(request);

    if accepted {
        Json(json!({"success": true, "message": "Connected", "version": "4.0.1.929"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "message": "Invalid API key"})),
        )
            .into_response()
    }
}

async fn list_servers(State(state): State<Arc<FakeDashboard>>) -> Response {
    Json(json!({"servers": state.servers.lock().await.clone()})).into_response()
}

async fn create_server(
    State(state): State<Arc<FakeDashboard>>,
    Json(mut item): Json<Value>,
) -> Response {
    if let Some(map) = item.as_object_mut() {
        map.insert("password".to_string(), json!("********"));
    }
    state.servers.lock().await.push(item.clone());
    Json(json!({"success": true, "server": item})).into_response()
}

async fn update_server(
    State(state): State<Arc<FakeDashboard>>,
    Path(index): Path<usize>,
    Json(item): Json<Value>,
) -> Response {
    let mut servers = state.servers.lock().await;
    let Some(slot) = servers.get_mut(index) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Server not found"})),
        )
            .into_response();
    };
    *slot = item.clone();
    Json(json!({"success": true, "server": item})).into_response()
}

async fn delete_server(
    State(state): State<Arc<FakeDashboard>>,
    Path(index): Path<usize>,
) -> Response {
    let mut servers = state.servers.lock().await;
    if index >= servers.len() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Server not found"})),
        )
            .into_response();
    }
    servers.remove(index);
    Json(json!({"success": true})).into_response()
}

fn router(state: Arc<FakeDashboard>) -> Router {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/api/settings/:app", post(save_settings))
        .route("/api/sonarr/test-connection", post(test_connection))
        .route("/api/nzb-hunt/test-connection", post(test_connection))
        .route("/api/nzb-hunt/servers", get(list_servers).post(create_server))
        .route(
            "/api/nzb-hunt/servers/:index",
            put(update_server).delete(delete_server),
        )
        .with_state(state)
}

/// Start the fake dashboard on an ephemeral port and return its base URL.
pub async fn spawn(state: Arc<FakeDashboard>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake dashboard");
    let addr = listener
        .local_addr()
        .expect("fake dashboard has no local address");

    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

/// Backend pointed at `base_url` with fast retries.
pub fn backend_for(base_url: &str) -> HttpSettingsBackend {
    let config = ClientConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        probe_timeout_secs: 5,
        max_retries: 2,
    };
    HttpSettingsBackend::new(&config).expect("valid test config")
}
