//! CLI configuration file
//!
//! ```toml
//! [client]
//! base_url = "http://localhost:9705"
//! max_retries = 2
//!
//! [editor]
//! probe_debounce_ms = 800
//! ```
//!
//! Every key is optional. A missing file means defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arr_settings_api::ClientConfig;
use arr_settings_core::types::EditorConfig;
use serde::Deserialize;

const CONFIG_DIR: &str = "arr-settings";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub editor: EditorConfig,
}

impl CliConfig {
    /// `<config_dir>/arr-settings/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            tracing::debug!("No config directory on this platform, using defaults");
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read config file {}", path.display()))
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply the `--url` flag (or `ARR_SETTINGS_URL`), which wins over the file.
    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.client.base_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arr_settings_api::DEFAULT_BASE_URL;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[client]\nbase_url = \"http://nas:9705/huntarr\"\n\n[editor]\nauto_save_ms = 3000\n",
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.client.base_url, "http://nas:9705/huntarr");
        assert_eq!(config.client.max_retries, ClientConfig::default().max_retries);
        assert_eq!(config.editor.auto_save_ms, 3000);
        assert_eq!(
            config.editor.probe_debounce_ms,
            EditorConfig::default().probe_debounce_ms
        );
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client\nbase_url = ").unwrap();

        let err = CliConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn url_flag_overrides_file() {
        let config = CliConfig::parse("[client]\nbase_url = \"http://file:9705\"\n")
            .unwrap()
            .with_url(Some("http://flag:9705".to_string()));
        assert_eq!(config.client.base_url, "http://flag:9705");

        let unchanged = CliConfig::default().with_url(Some("  ".to_string()));
        assert_eq!(unchanged.client.base_url, DEFAULT_BASE_URL);
    }
}
