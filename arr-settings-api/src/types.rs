use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ App Types ============

/// Integrated application (settings section) managed by the dashboard.
///
/// Serialized as the key used in the settings document (`"sonarr"`,
/// `"nzb_hunt"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    /// TV series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
    /// Music manager.
    Lidarr,
    /// Book manager.
    Readarr,
    /// Adult content manager (v2).
    Whisparr,
    /// Adult content manager (v3).
    Eros,
    /// Dashboard-wide settings (no instances).
    General,
    /// Built-in NZB downloader (servers and categories).
    NzbHunt,
}

impl AppType {
    /// Every app type, in display order.
    pub const ALL: [Self; 8] = [
        Self::Sonarr,
        Self::Radarr,
        Self::Lidarr,
        Self::Readarr,
        Self::Whisparr,
        Self::Eros,
        Self::General,
        Self::NzbHunt,
    ];

    /// Key used in the settings document.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
            Self::Lidarr => "lidarr",
            Self::Readarr => "readarr",
            Self::Whisparr => "whisparr",
            Self::Eros => "eros",
            Self::General => "general",
            Self::NzbHunt => "nzb_hunt",
        }
    }

    /// Segment used in REST paths (`/api/{segment}/test-connection`).
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::NzbHunt => "nzb-hunt",
            other => other.as_str(),
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Sonarr => "Sonarr",
            Self::Radarr => "Radarr",
            Self::Lidarr => "Lidarr",
            Self::Readarr => "Readarr",
            Self::Whisparr => "Whisparr",
            Self::Eros => "Eros",
            Self::General => "General",
            Self::NzbHunt => "NZB Hunt",
        }
    }

    /// Whether the app's settings carry an `instances` list.
    #[must_use]
    pub fn has_instances(self) -> bool {
        !matches!(self, Self::General | Self::NzbHunt)
    }
}

impl std::fmt::Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|app| app.as_str() == normalized)
            .ok_or_else(|| format!("Unknown app type: {s}"))
    }
}

// ============ Settings Documents ============

/// Full settings document returned by `GET /api/settings`, keyed by app type.
///
/// Unknown sections are preserved untouched so a newer backend does not
/// break an older client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerSettings(Map<String, Value>);

impl ServerSettings {
    /// Wrap a raw JSON object.
    #[must_use]
    pub fn new(sections: Map<String, Value>) -> Self {
        Self(sections)
    }

    /// Section for one app, if present.
    #[must_use]
    pub fn get(&self, app: AppType) -> Option<&Value> {
        self.0.get(app.as_str())
    }

    /// Replace the section for one app.
    pub fn insert(&mut self, app: AppType, section: Value) {
        self.0.insert(app.as_str().to_string(), section);
    }

    /// Known app types present in the document.
    pub fn apps(&self) -> Vec<AppType> {
        AppType::ALL
            .into_iter()
            .filter(|app| self.0.contains_key(app.as_str()))
            .collect()
    }

    /// Raw sections, including unknown ones.
    #[must_use]
    pub fn sections(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ============ Connection Tests ============

/// Body of `POST /api/{app}/test-connection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestConnectionRequest {
    /// HTTP API of an *arr instance.
    Http {
        /// Base URL of the instance.
        api_url: String,
        /// API key; `None` means "reuse the stored one for `instance_index`".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        /// Request timeout the backend should use, in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_timeout: Option<u64>,
        /// Index of an already saved instance whose stored key to reuse.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance_index: Option<usize>,
    },
    /// NNTP server of NZB Hunt.
    Server {
        /// Server host name.
        host: String,
        /// Server port.
        port: u16,
        /// Whether to connect with TLS.
        use_ssl: bool,
        /// Login name (may be empty).
        username: String,
        /// Password; `None` means "reuse the stored one for `server_index`".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// Index of an already saved server whose stored password to reuse.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        server_index: Option<usize>,
    },
}

/// Response of a connection test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConnectionResponse {
    /// Whether the target was reachable and accepted the credentials.
    pub success: bool,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Version reported by the target, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Error payload of a non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Preferred error field.
    #[serde(default)]
    pub error: Option<String>,
    /// Fallback message field.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The message to surface, preferring `error` over `message`.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.error
            .filter(|s| !s.trim().is_empty())
            .or(self.message.filter(|s| !s.trim().is_empty()))
    }
}

// ============ Collections ============

/// List-valued sub-resource with REST CRUD endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// NZB Hunt usenet servers.
    NzbServers,
    /// NZB Hunt download categories.
    NzbCategories,
    /// Movie Hunt instances.
    MovieHuntInstances,
    /// TV Hunt instances.
    TvHuntInstances,
}

impl Collection {
    /// Base path of the collection.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::NzbServers => "/api/nzb-hunt/servers",
            Self::NzbCategories => "/api/nzb-hunt/categories",
            Self::MovieHuntInstances => "/api/movie-hunt/instances",
            Self::TvHuntInstances => "/api/tv-hunt/instances",
        }
    }

    /// Key under which list responses wrap their items, if they do.
    #[must_use]
    pub fn list_key(self) -> &'static str {
        match self {
            Self::NzbServers => "servers",
            Self::NzbCategories => "categories",
            Self::MovieHuntInstances | Self::TvHuntInstances => "instances",
        }
    }

    /// Human-readable name of a single item.
    #[must_use]
    pub fn item_label(self) -> &'static str {
        match self {
            Self::NzbServers => "server",
            Self::NzbCategories => "category",
            Self::MovieHuntInstances | Self::TvHuntInstances => "instance",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
