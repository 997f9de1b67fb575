//! Configuration loading and resolution
//!
//! Every setting is resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never prevents startup: the problem is
//! logged and the remaining tiers are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::storage::STORAGE_FILE_NAME;
use crate::{Error, Result};

/// Environment variable overriding the backend base URL
pub const ENV_API_URL: &str = "MYPOKEDEX_API_URL";

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "MYPOKEDEX_DATA_DIR";

/// Directory name used under the platform config/data roots
const APP_DIR_NAME: &str = "mypokedex";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive applied when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// No request timeout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fallback values used when no other tier provides a setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDefaults {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./mypokedex_data"));

        Self {
            api_base_url: "http://localhost:8080".to_string(),
            data_dir,
            log_level: default_log_level(),
        }
    }
}

/// Platform config file location (`~/.config/mypokedex/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Read the TOML config file at `path` if there is one
///
/// A missing path or file yields the defaults; a file that exists but cannot
/// be read or parsed is an error, so the caller decides how to report it.
pub fn read_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config directory on this platform, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    load_toml_config(path)
}

/// Parse a TOML config file, falling back to defaults on any problem
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    read_toml_config(path).unwrap_or_else(|e| {
        warn!("Ignoring unreadable config file: {}", e);
        TomlConfig::default()
    })
}

/// Effective client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without trailing slash, e.g. `http://localhost:8080`
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub request_timeout: Option<Duration>,
    pub log_level: String,
}

impl ClientConfig {
    /// Path of the local storage file
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE_NAME)
    }

    /// Create the data directory (idempotent)
    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// Resolves [`ClientConfig`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_api_url: Option<String>,
    cli_data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    toml: Option<TomlConfig>,
}

impl ConfigResolver {
    /// Resolver reading the platform config file
    pub fn new() -> Self {
        Self {
            config_path: default_config_path(),
            ..Self::default()
        }
    }

    pub fn with_cli_api_url(mut self, url: Option<String>) -> Self {
        self.cli_api_url = url;
        self
    }

    pub fn with_cli_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cli_data_dir = dir;
        self
    }

    /// Read this TOML file instead of the platform default
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.config_path = path;
        }
        self
    }

    /// Use an already-read TOML file; the config path is then not read again
    pub fn with_toml(mut self, toml: TomlConfig) -> Self {
        self.toml = Some(toml);
        self
    }

    pub fn resolve(&self) -> Result<ClientConfig> {
        let toml = match &self.toml {
            Some(toml) => toml.clone(),
            None => load_toml_config_or_default(self.config_path.as_deref()),
        };
        let defaults = CompiledDefaults::for_current_platform();

        let api_base_url = self
            .cli_api_url
            .clone()
            .or_else(|| non_empty_env(ENV_API_URL))
            .or(toml.api_base_url)
            .unwrap_or(defaults.api_base_url);
        let api_base_url = normalize_base_url(&api_base_url)?;

        let data_dir = self
            .cli_data_dir
            .clone()
            .or_else(|| non_empty_env(ENV_DATA_DIR).map(PathBuf::from))
            .or(toml.data_dir)
            .unwrap_or(defaults.data_dir);

        Ok(ClientConfig {
            api_base_url,
            data_dir,
            request_timeout: toml
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_level: toml.logging.level,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate scheme and strip trailing slashes
pub fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API base URL must start with http:// or https://, got {:?}",
            url
        )));
    }
    Ok(trimmed.to_string())
}
