//! YAML configuration: coordinate, named connections, schedule.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default config location.
pub const CONFIG_ENV: &str = "WEATHER_ETL_CONFIG";

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Coordinate {
    /// London.
    fn default() -> Self {
        Self {
            latitude: 51.5074,
            longitude: -0.1278,
        }
    }
}

/// Named HTTP connection to the Open-Meteo API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConnection {
    #[serde(default = "default_api_conn_id")]
    pub conn_id: String,
    /// Scheme and host, without the `/v1/forecast` path
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for HttpConnection {
    fn default() -> Self {
        Self {
            conn_id: default_api_conn_id(),
            base_url: default_base_url(),
        }
    }
}

/// Named database connection (SQLite file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    #[serde(default = "default_db_conn_id")]
    pub conn_id: String,
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConnection {
    fn default() -> Self {
        Self {
            conn_id: default_db_conn_id(),
            path: default_db_path(),
        }
    }
}

fn default_api_conn_id() -> String {
    "open_meteo_api".to_string()
}

fn default_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_db_conn_id() -> String {
    "weather_db".to_string()
}

fn default_db_path() -> PathBuf {
    weather_etl_dir().join("weather.db")
}

fn default_dag_id() -> String {
    "weather_etl_pipeline".to_string()
}

fn default_schedule() -> String {
    "@daily".to_string()
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identifier the scheduler registers the chain under
    #[serde(default = "default_dag_id")]
    pub dag_id: String,
    /// Cron expression or shorthand (`@daily`, `@hourly`, ...)
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Whether missed intervals should be back-filled by the scheduler
    #[serde(default)]
    pub catchup: bool,
    #[serde(default)]
    pub location: Coordinate,
    #[serde(default)]
    pub api: HttpConnection,
    #[serde(default)]
    pub database: DatabaseConnection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dag_id: default_dag_id(),
            schedule: default_schedule(),
            catchup: false,
            location: Coordinate::default(),
            api: HttpConnection::default(),
            database: DatabaseConnection::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load the configuration for this invocation.
    ///
    /// Order: explicit path, then `$WEATHER_ETL_CONFIG`, then
    /// `~/.weather-etl/config.yaml`. Explicit and environment paths must
    /// exist; a missing default file falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("[Config] loading {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            log::info!("[Config] loading {} (from {})", path, CONFIG_ENV);
            return Self::from_file(path);
        }

        let path = default_config_path();
        if !path.exists() {
            log::info!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        log::info!("[Config] loading {}", path.display());
        Self::from_file(path)
    }

    /// Check coordinate ranges, the API base URL and the schedule expression.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Coordinate {
            latitude,
            longitude,
        } = self.location;
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ConfigError::ValidationError(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::ValidationError(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }

        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!("api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url '{}' must be http or https",
                self.api.base_url
            )));
        }

        if self.dag_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dag_id must not be empty".to_string(),
            ));
        }

        crate::dag::parse_schedule(&self.schedule)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }
}

/// `~/.weather-etl`, or `/tmp/.weather-etl` without a home directory.
pub fn weather_etl_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".weather-etl")
}

/// Default config location, `~/.weather-etl/config.yaml`.
pub fn default_config_path() -> PathBuf {
    weather_etl_dir().join("config.yaml")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
