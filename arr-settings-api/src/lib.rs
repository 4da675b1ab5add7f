//! # arr-settings-api
//!
//! Typed client for the settings REST API of an *arr automation dashboard
//! (Sonarr, Radarr, Lidarr, Readarr, Whisparr, Eros, NZB Hunt).
//!
//! ## Endpoints
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | Fetch all settings | `GET /api/settings` |
//! | Save one section | `POST /api/settings/{app}` |
//! | Connection test | `POST /api/{app}/test-connection` |
//! | Collection CRUD | `GET`/`POST {collection}`, `PUT`/`DELETE {collection}/{index}` |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arr_settings_api::{AppType, ClientConfig, HttpSettingsBackend, SettingsBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpSettingsBackend::new(&ClientConfig::default())?;
//!
//!     let settings = backend.fetch_settings().await?;
//!     if let Some(sonarr) = settings.get(AppType::Sonarr) {
//!         println!("{sonarr}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ApiError>`](ApiError):
//!
//! - [`ApiError::ServerRejected`]: non-2xx with an `error`/`message` payload
//! - [`ApiError::NetworkError`] / [`ApiError::Timeout`]: transport failures (retryable)
//! - [`ApiError::ParseError`]: malformed response
//!
//! Idempotent reads are retried with exponential backoff; writes are not.

mod client;
mod error;
mod http_client;
mod traits;
mod types;
mod utils;

pub use client::{ClientConfig, DEFAULT_BASE_URL, HttpSettingsBackend};

pub use error::{ApiError, Result};

pub use traits::SettingsBackend;

pub use types::{
    AppType, Collection, ErrorBody, ServerSettings, TestConnectionRequest, TestConnectionResponse,
};

pub use utils::log_sanitizer;
