//! Engine configuration.
//!
//! Loaded from `$UPWARD_CONFIG_PATH` or `<config_dir>/upward/config.yaml`.
//! A missing file yields defaults; `.json` files are parsed as JSON and every
//! other extension as YAML.

use std::{fs, path::Path, path::PathBuf};

use anyhow::Context as _;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use upward_util::config_file_path;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "UPWARD_CONFIG_PATH";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Settings for the default network fetch capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Headers sent with every request; definition headers take precedence.
    #[serde(default)]
    pub default_headers: IndexMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            default_headers: IndexMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("upward/{}; {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub ambiguous_telltales: AmbiguityPolicy,
    /// Deadline applied by callers around a whole resolution.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

/// What to do when a mapping carries the telltales of several resolver kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Use the first registered kind and log a warning.
    #[default]
    FirstMatch,
    /// Fail with `ResolveError::AmbiguousDefinition`.
    Error,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("http.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("http.user_agent must not be blank")]
    BlankUserAgent,

    #[error("resolution.deadline_secs must be greater than zero")]
    ZeroDeadline,

    #[error("invalid default header name '{name}'")]
    InvalidHeaderName { name: String },
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Returns the default path for the engine configuration file.
pub fn default_config_path() -> PathBuf {
    config_file_path(CONFIG_PATH_ENV, "config.yaml")
}

/// Loads configuration from the default path.
pub fn load_config() -> anyhow::Result<EngineConfig> {
    load_config_from_path(&default_config_path())
}

/// Loads and validates configuration from a specific path.
pub fn load_config_from_path(path: &Path) -> anyhow::Result<EngineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let is_json = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let config: EngineConfig = if is_json {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON config: {}", path.display()))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML config: {}", path.display()))?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }
    if config.http.user_agent.as_deref().is_some_and(|agent| agent.trim().is_empty()) {
        return Err(ConfigError::BlankUserAgent);
    }
    if config.resolution.deadline_secs == Some(0) {
        return Err(ConfigError::ZeroDeadline);
    }
    if let Some(name) = config
        .http
        .default_headers
        .keys()
        .find(|name| reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err())
    {
        return Err(ConfigError::InvalidHeaderName { name: name.clone() });
    }
    Ok(())
}
