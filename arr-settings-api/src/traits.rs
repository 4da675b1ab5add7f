use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{AppType, Collection, ServerSettings, TestConnectionRequest, TestConnectionResponse};

/// Settings backend Trait
///
/// The REST API the dashboard talks to. Implementations:
/// - [`HttpSettingsBackend`](crate::HttpSettingsBackend): reqwest over HTTP
/// - test mocks in downstream crates
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// `GET /api/settings`: every settings section, keyed by app type.
    async fn fetch_settings(&self) -> Result<ServerSettings>;

    /// `POST /api/settings/{app}`: persist one section.
    ///
    /// Returns the canonical section as stored by the backend, which may
    /// contain generated or derived fields the client did not send.
    async fn save_settings(&self, app: AppType, settings: &Value) -> Result<Value>;

    /// `POST /api/{app}/test-connection`: probe reachability and credentials.
    async fn test_connection(
        &self,
        app: AppType,
        request: &TestConnectionRequest,
    ) -> Result<TestConnectionResponse>;

    /// `GET {collection}`: list items in order.
    async fn list_items(&self, collection: Collection) -> Result<Vec<Value>>;

    /// `POST {collection}`: append an item; returns the stored item.
    async fn create_item(&self, collection: Collection, item: &Value) -> Result<Value>;

    /// `PUT {collection}/{index}`: replace the item at `index`; returns the stored item.
    async fn update_item(&self, collection: Collection, index: usize, item: &Value)
    -> Result<Value>;

    /// `DELETE {collection}/{index}`: remove the item at `index`.
    ///
    /// Items after `index` shift down by one on the backend.
    async fn delete_item(&self, collection: Collection, index: usize) -> Result<()>;
}
