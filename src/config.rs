//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub influxdb: InfluxConfig,

    #[serde(default)]
    pub grafana: GrafanaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lifetime of a login session
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_ttl() -> u64 {
    3600 // 1 hour
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// InfluxDB v2 connection settings
///
/// Credentials are not configured here; each session logs in with its own
/// API token and organization.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_url")]
    pub url: String,

    #[serde(default = "default_influx_timeout")]
    pub request_timeout_ms: u64,

    /// Range start used by measurement and field listing queries
    #[serde(default = "default_schema_lookback")]
    pub schema_lookback: String,
}

fn default_influx_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_influx_timeout() -> u64 {
    10_000
}

fn default_schema_lookback() -> String {
    "-10y".to_string()
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            request_timeout_ms: default_influx_timeout(),
            schema_lookback: default_schema_lookback(),
        }
    }
}

/// Grafana dashboard integration
#[derive(Debug, Clone, Deserialize)]
pub struct GrafanaConfig {
    /// Grafana base URL; the integration is disabled when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Base URL used when building links for the browser
    #[serde(default = "default_grafana_public_url")]
    pub public_url: String,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_datasource_name")]
    pub datasource_name: String,

    /// InfluxDB URL as seen from the Grafana server
    #[serde(default = "default_datasource_influx_url")]
    pub datasource_influx_url: String,

    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    #[serde(default = "default_grafana_timeout")]
    pub request_timeout_ms: u64,
}

fn default_grafana_public_url() -> String {
    "http://localhost:3006".to_string()
}

fn default_datasource_name() -> String {
    "InfluxDB-v2".to_string()
}

fn default_datasource_influx_url() -> String {
    "http://influxdb:8086".to_string()
}

fn default_bucket() -> String {
    "influx-bucket".to_string()
}

fn default_grafana_timeout() -> u64 {
    10_000
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: None,
            public_url: default_grafana_public_url(),
            api_token: None,
            username: None,
            password: None,
            datasource_name: default_datasource_name(),
            datasource_influx_url: default_datasource_influx_url(),
            default_bucket: default_bucket(),
            request_timeout_ms: default_grafana_timeout(),
        }
    }
}

impl GrafanaConfig {
    /// True when a base URL and some form of credentials are present
    pub fn is_enabled(&self) -> bool {
        let has_token = self.api_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_basic = self.username.is_some() && self.password.is_some();
        self.url.is_some() && (has_token || has_basic)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("fluxbuilder").join("config.toml")),
            Some(PathBuf::from("/etc/fluxbuilder/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = var("FLUXBUILDER_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("FLUXBUILDER_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // InfluxDB overrides
        if let Some(url) = var("INFLUXDB_URL") {
            self.influxdb.url = url;
        }

        // Grafana overrides
        if let Some(url) = var("GRAFANA_URL") {
            self.grafana.url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(url) = var("GRAFANA_PUBLIC_URL") {
            self.grafana.public_url = url;
        }
        if let Some(token) = var("GRAFANA_API_TOKEN") {
            self.grafana.api_token = Some(token);
        }
        if let Some(username) = var("GRAFANA_USERNAME") {
            self.grafana.username = Some(username);
        }
        if let Some(password) = var("GRAFANA_PASSWORD") {
            self.grafana.password = Some(password);
        }

        // Logging overrides
        if let Some(level) = var("FLUXBUILDER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FLUXBUILDER_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# fluxbuilder Configuration
#
# Environment variables override these settings:
# - FLUXBUILDER_API_HOST
# - FLUXBUILDER_API_PORT
# - INFLUXDB_URL
# - GRAFANA_URL
# - GRAFANA_PUBLIC_URL
# - GRAFANA_API_TOKEN
# - GRAFANA_USERNAME / GRAFANA_PASSWORD
# - FLUXBUILDER_LOG_LEVEL
# - FLUXBUILDER_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3001

# Request timeout in seconds
request_timeout_secs = 30

# Login session lifetime in seconds
session_ttl_secs = 3600

[influxdb]
# InfluxDB v2 server URL
url = "http://localhost:8086"

# Request timeout (ms)
request_timeout_ms = 10000

# How far back measurement and field listings look
schema_lookback = "-10y"

[grafana]
# Grafana server URL (leave unset to disable dashboard creation)
# url = "http://localhost:3000"

# URL used for links opened in the browser
public_url = "http://localhost:3006"

# Either an API token or basic auth credentials
# api_token = ""
# username = "admin"
# password = "admin"

# Datasource created in Grafana for InfluxDB
datasource_name = "InfluxDB-v2"

# InfluxDB URL as reachable from Grafana
datasource_influx_url = "http://influxdb:8086"

# Default bucket for the datasource
default_bucket = "influx-bucket"

# Request timeout (ms)
request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
