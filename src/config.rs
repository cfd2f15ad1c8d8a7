//! Configuration management for geofuse using the prefer crate.
//!
//! Precedence, lowest to highest: built-in defaults, config file,
//! environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StartupConfigError;
use crate::providers::http::USER_AGENT;
use crate::providers::{OverpassConfig, YelpConfig};

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Default credential file, resolved relative to the config file or CWD.
pub const DEFAULT_CREDENTIALS_FILE: &str = "config_secret.json";

/// Default per-provider deadline in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Default number of extra attempts on transient provider failures.
pub const DEFAULT_RETRIES: u32 = 1;

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind: String,
    /// Path to the business-search credential file.
    pub credentials_path: PathBuf,
    /// User agent for upstream requests.
    pub user_agent: String,
    /// Deadline for each provider call, retries included.
    pub provider_timeout: Duration,
    /// Extra attempts on transient failures.
    pub retries: u32,
    pub yelp: YelpConfig,
    pub overpass: OverpassConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            user_agent: USER_AGENT.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            yelp: YelpConfig::default(),
            overpass: OverpassConfig::default(),
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GEOFUSE_BIND`: bind address
    /// - `GEOFUSE_CREDENTIALS`: credential file path
    /// - `GEOFUSE_PROVIDER_TIMEOUT`: per-provider deadline in seconds
    /// - `GEOFUSE_RETRIES`: extra attempts on transient failures
    ///
    /// Provider sections read their own variables (`YELP_*`, `OVERPASS_*`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(bind) = non_empty_env("GEOFUSE_BIND") {
            tracing::debug!("Using GEOFUSE_BIND from environment: {}", bind);
            self.bind = bind;
        }
        if let Some(path) = non_empty_env("GEOFUSE_CREDENTIALS") {
            tracing::debug!("Using GEOFUSE_CREDENTIALS from environment: {}", path);
            self.credentials_path = expand_path(&path);
        }
        if let Some(secs) = non_empty_env("GEOFUSE_PROVIDER_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.provider_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = non_empty_env("GEOFUSE_RETRIES").and_then(|v| v.parse().ok()) {
            self.retries = retries;
        }
        self.yelp = self.yelp.with_env_overrides();
        self.overpass = self.overpass.with_env_overrides();
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn expand_path(path_str: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path_str).as_ref())
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bind address for the HTTP server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Credential file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Per-provider deadline in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timeout_secs: Option<u64>,
    /// Extra attempts on transient provider failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Business search provider.
    #[serde(default)]
    pub yelp: YelpConfig,
    /// Map feature provider.
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `geofuse` config file in the standard locations.
    ///
    /// Returns the default config when nothing is found.
    pub async fn load() -> Result<Self, StartupConfigError> {
        match prefer::load("geofuse").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await,
                None => Ok(Self::default()),
            },
            Err(_) => {
                tracing::debug!("No geofuse config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, StartupConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| StartupConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |message: String| StartupConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        };

        tracing::debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, if one was loaded.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = expand_path(path_str);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        let credentials = self
            .credentials
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS_FILE);
        settings.credentials_path = self.resolve_path(credentials, base_dir);
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(secs) = self.provider_timeout_secs {
            settings.provider_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.retries {
            settings.retries = retries;
        }
        settings.yelp = self.yelp.clone();
        settings.overpass = self.overpass.clone();
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Resolve settings from the config file and environment.
pub async fn load_settings(options: &LoadOptions) -> Result<Settings, StartupConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await?,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    let settings = settings.with_env_overrides();

    if settings.provider_timeout.is_zero() {
        return Err(StartupConfigError::Invalid(
            "provider timeout must be greater than zero".to_string(),
        ));
    }
    Ok(settings)
}
