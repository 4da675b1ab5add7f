//! Field tables per settings page
//!
//! Every editor page is described by an ordered [`FieldTable`]. The table
//! drives rendering, read-back, dirty comparison and validation.

use arr_settings_api::{AppType, Collection};

use crate::types::{FieldSpec, SelectOption, validate_host, validate_http_url, validate_tag};

/// Ordered fields of one editor page.
#[derive(Debug, Clone)]
pub struct FieldTable {
    title: &'static str,
    fields: Vec<FieldSpec>,
}

impl FieldTable {
    fn build(title: &'static str, parts: &[&[FieldSpec]]) -> Self {
        Self {
            title,
            fields: parts.iter().flat_map(|p| p.iter().copied()).collect(),
        }
    }

    /// Fields of one instance of an *arr app.
    ///
    /// Apps without instances get the general table.
    #[must_use]
    pub fn for_instance(app: AppType) -> Self {
        let hunt: &[FieldSpec] = match app {
            AppType::Sonarr => SONARR_HUNT,
            AppType::Radarr => RADARR_HUNT,
            AppType::Lidarr => LIDARR_HUNT,
            AppType::Readarr => READARR_HUNT,
            AppType::Whisparr => WHISPARR_HUNT,
            AppType::Eros => EROS_HUNT,
            AppType::General | AppType::NzbHunt => return Self::general(),
        };
        Self::build(app.display_name(), &[CONNECTION, hunt, TUNING])
    }

    /// Dashboard-wide settings.
    #[must_use]
    pub fn general() -> Self {
        Self::build("General", &[GENERAL])
    }

    /// App-level (non-instance) settings page, if the app has one.
    #[must_use]
    pub fn for_app_level(app: AppType) -> Option<Self> {
        match app {
            AppType::General => Some(Self::general()),
            _ => None,
        }
    }

    /// Form for one item of a collection.
    #[must_use]
    pub fn for_collection(collection: Collection) -> Self {
        match collection {
            Collection::NzbServers => Self::build("Usenet Server", &[NZB_SERVER]),
            Collection::NzbCategories => Self::build("Category", &[NZB_CATEGORY]),
            Collection::MovieHuntInstances => Self::build("Movie Hunt Instance", &[HUNT_INSTANCE]),
            Collection::TvHuntInstances => Self::build("TV Hunt Instance", &[HUNT_INSTANCE]),
        }
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys of host/URL fields.
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.key)
    }
}

// ===== Shared option lists =====

const STATE_MODES: &[SelectOption] = &[
    SelectOption::new("custom", "Enabled"),
    SelectOption::new("disabled", "Disabled"),
];

const LOG_LEVELS: &[SelectOption] = &[
    SelectOption::new("DEBUG", "Debug"),
    SelectOption::new("INFO", "Info"),
    SelectOption::new("WARNING", "Warning"),
    SelectOption::new("ERROR", "Error"),
];

const AUTH_MODES: &[SelectOption] = &[
    SelectOption::new("login", "Login"),
    SelectOption::new("local_bypass", "Local bypass"),
    SelectOption::new("no_login", "No login"),
];

// ===== Instance tables =====

const CONNECTION: &[FieldSpec] = &[
    FieldSpec::text("name", "Name", ""),
    FieldSpec::url("api_url", "URL")
        .required()
        .validated(validate_http_url)
        .with_help("Base URL, e.g. http://localhost:8989"),
    FieldSpec::password("api_key", "API Key"),
    FieldSpec::checkbox("enabled", "Enabled", true),
];

const SONARR_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_items", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_items", "Upgrade Search", 0, 0, 1000),
    FieldSpec::select(
        "hunt_missing_mode",
        "Missing Search Mode",
        &[
            SelectOption::new("seasons_packs", "Season packs"),
            SelectOption::new("shows", "Shows"),
            SelectOption::new("episodes", "Episodes"),
        ],
        "seasons_packs",
    ),
    FieldSpec::select(
        "upgrade_mode",
        "Upgrade Mode",
        &[
            SelectOption::new("seasons_packs", "Season packs"),
            SelectOption::new("episodes", "Episodes"),
        ],
        "seasons_packs",
    ),
    FieldSpec::number("air_date_delay_days", "Air Date Delay (days)", 0, 0, 365),
];

const RADARR_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_movies", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_movies", "Upgrade Search", 0, 0, 1000),
    FieldSpec::select(
        "release_type",
        "Release Type",
        &[
            SelectOption::new("physical", "Physical"),
            SelectOption::new("digital", "Digital"),
            SelectOption::new("cinema", "Cinema"),
        ],
        "physical",
    ),
];

const LIDARR_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_items", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_items", "Upgrade Search", 0, 0, 1000),
    FieldSpec::select(
        "hunt_missing_mode",
        "Missing Search Mode",
        &[
            SelectOption::new("album", "Album"),
            SelectOption::new("artist", "Artist"),
        ],
        "album",
    ),
];

const READARR_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_books", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_books", "Upgrade Search", 0, 0, 1000),
];

const WHISPARR_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_items", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_items", "Upgrade Search", 0, 0, 1000),
];

const EROS_HUNT: &[FieldSpec] = &[
    FieldSpec::number("hunt_missing_items", "Missing Search", 1, 0, 1000),
    FieldSpec::number("hunt_upgrade_items", "Upgrade Search", 0, 0, 1000),
    FieldSpec::select(
        "search_mode",
        "Search Mode",
        &[
            SelectOption::new("movie", "Movie"),
            SelectOption::new("scene", "Scene"),
        ],
        "movie",
    ),
];

const TUNING: &[FieldSpec] = &[
    FieldSpec::checkbox("monitored_only", "Monitored Only", true),
    FieldSpec::checkbox("skip_future_releases", "Skip Future Releases", true),
    FieldSpec::number("sleep_duration", "Sleep Duration (seconds)", 900, 60, 86_400),
    FieldSpec::number("hourly_cap", "API Cap (per hour)", 20, 1, 400),
    FieldSpec::select("state_management_mode", "State Management", STATE_MODES, "custom"),
    FieldSpec::number("state_management_hours", "State Reset (hours)", 72, 1, 8760),
    FieldSpec::number("api_timeout", "API Timeout (seconds)", 120, 10, 300),
    FieldSpec::number("command_wait_delay", "Command Wait Delay (seconds)", 1, 1, 10),
    FieldSpec::number("command_wait_attempts", "Command Wait Attempts", 600, 0, 1800),
    FieldSpec::number("max_download_queue_size", "Max Download Queue", -1, -1, 1000)
        .with_help("-1 disables the check"),
    FieldSpec::text("custom_tags_missing", "Missing Tag", "huntarr-missing")
        .validated(validate_tag),
    FieldSpec::text("custom_tags_upgrade", "Upgrade Tag", "huntarr-upgraded")
        .validated(validate_tag),
    FieldSpec::checkbox("tag_processed_items", "Tag Processed Items", true),
];

// ===== General =====

const GENERAL: &[FieldSpec] = &[
    FieldSpec::select("log_level", "Log Level", LOG_LEVELS, "INFO"),
    FieldSpec::checkbox("check_for_updates", "Check for Updates", true),
    FieldSpec::checkbox("ssl_verify", "Verify SSL Certificates", true),
    FieldSpec::text("base_url", "Base URL", "").with_help("Reverse proxy sub-path, e.g. /huntarr"),
    FieldSpec::select("auth_mode", "Authentication", AUTH_MODES, "login"),
    FieldSpec::number("api_timeout", "API Timeout (seconds)", 120, 10, 300),
];

// ===== Collections =====

const NZB_SERVER: &[FieldSpec] = &[
    FieldSpec::text("name", "Name", ""),
    FieldSpec::text("host", "Host", "")
        .required()
        .validated(validate_host),
    FieldSpec::number("port", "Port", 563, 1, 65_535),
    FieldSpec::checkbox("use_ssl", "Use SSL", true),
    FieldSpec::text("username", "Username", ""),
    FieldSpec::password("password", "Password"),
    FieldSpec::number("connections", "Connections", 8, 1, 200),
    FieldSpec::number("priority", "Priority", 0, 0, 99).with_help("0 is the highest priority"),
    FieldSpec::checkbox("enabled", "Enabled", true),
];

const NZB_CATEGORY: &[FieldSpec] = &[
    FieldSpec::text("name", "Name", "").required(),
    FieldSpec::text("folder", "Folder", ""),
];

const HUNT_INSTANCE: &[FieldSpec] = &[FieldSpec::text("name", "Name", "").required()];
