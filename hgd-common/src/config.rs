//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: the service logs a warning and starts
//! with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "HGD_ROOT_FOLDER";

/// Environment variable carrying the geocoding API key
pub const ENV_GEOCODING_API_KEY: &str = "HGD_GEOCODING_API_KEY";

/// Default HTTP port for hgd-server
pub const DEFAULT_PORT: u16 = 5730;

/// Default bind address (loopback only)
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Google Geocoding API JSON endpoint
pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Wikipedia REST page summary endpoint (title is appended as a path segment)
pub const DEFAULT_ENRICHMENT_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

/// Default timeout for outbound HTTP calls
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;

/// Directory (and URL prefix) for contact profile images
pub const CONTACT_ASSETS_DIR: &str = "contact_assets";

/// Directory (and URL prefix) for location images
pub const LOCATION_ASSETS_DIR: &str = "location_assets";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the locations document, contacts and image assets
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Interface to bind (e.g. "127.0.0.1", "0.0.0.0")
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Geocoding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// API key (overridden by `HGD_GEOCODING_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_geocoding_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Encyclopedia enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// When false, enrichment always yields the "No information found" sentinel
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_enrichment_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_enrichment_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_enrichment_url() -> String {
    DEFAULT_ENRICHMENT_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    /// Default config file path: `<config dir>/hgd/hgd-server.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hgd").join("hgd-server.toml"))
    }

    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the config file, falling back to defaults when it is missing or invalid
    ///
    /// `explicit` is the path given on the command line; when absent the
    /// platform default path is tried. Nothing is logged here because this
    /// runs before the tracing subscriber exists; call [`ConfigOrigin::log`]
    /// once logging is up.
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, ConfigOrigin) {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return (Self::default(), ConfigOrigin::NoConfigDir),
            },
        };

        if !path.exists() {
            return (Self::default(), ConfigOrigin::Missing(path));
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => (Self::default(), ConfigOrigin::Invalid(path, e.to_string())),
        }
    }
}

/// Where the effective TOML configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// File does not exist; compiled defaults in use
    Missing(PathBuf),
    /// File exists but could not be read or parsed; compiled defaults in use
    Invalid(PathBuf, String),
    /// Platform config directory unknown; compiled defaults in use
    NoConfigDir,
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Missing(path) => {
                warn!("Config file {} not found, using defaults", path.display())
            }
            ConfigOrigin::Invalid(_, reason) => warn!("{}; using defaults", reason),
            ConfigOrigin::NoConfigDir => {
                warn!("Could not determine config directory, using defaults")
            }
        }
    }
}

/// Validate a secret or identifier value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the geocoding API key
///
/// **Priority:** ENV → TOML. Returns `None` when no source holds a valid key;
/// geocoding requests will then be refused by the upstream service.
pub fn resolve_geocoding_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(ENV_GEOCODING_API_KEY)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .geocoding
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env), Some(_)) => {
            warn!(
                "Geocoding API key found in environment and TOML. Using environment (highest priority)."
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("Geocoding API key loaded from environment variable");
            Some(env)
        }
        (None, Some(toml)) => {
            info!("Geocoding API key loaded from TOML config");
            Some(toml)
        }
        (None, None) => {
            warn!(
                "Geocoding API key not configured. Set {} or [geocoding] api_key in the TOML config",
                ENV_GEOCODING_API_KEY
            );
            None
        }
    }
}

/// Root folder resolution: CLI → ENV → TOML → compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder from the TOML config file
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if is_valid_key(&path) {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hgd"))
        .unwrap_or_else(|| PathBuf::from("./hgd_data"))
}

/// Filesystem layout under the root folder
///
/// ```text
/// <root>/locations.json
/// <root>/contacts/<id>.json
/// <root>/contact_assets/<image>
/// <root>/location_assets/<image>
/// ```
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder and its subdirectories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [
            self.root_folder.clone(),
            self.contacts_dir(),
            self.contact_assets_dir(),
            self.location_assets_dir(),
        ] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn locations_path(&self) -> PathBuf {
        self.root_folder.join("locations.json")
    }

    pub fn contacts_dir(&self) -> PathBuf {
        self.root_folder.join("contacts")
    }

    pub fn contact_assets_dir(&self) -> PathBuf {
        self.root_folder.join(CONTACT_ASSETS_DIR)
    }

    pub fn location_assets_dir(&self) -> PathBuf {
        self.root_folder.join(LOCATION_ASSETS_DIR)
    }
}
