use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const CONFIG_DIR_NAME: &str = "clinic-dashboard";
const TOKEN_ENV_VAR: &str = "CLINIC_API_TOKEN";

/// View modes accepted by `calendar.default_view`.
pub const VIEW_NAMES: [&str; 4] = ["day", "week", "month", "list"];

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    pub api: ApiConfig,

    /// Query cache and retry settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Calendar page defaults
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8000/api`
    pub base_url: String,

    /// Bearer token (optional, can be set via `CLINIC_API_TOKEN`)
    pub token: Option<String>,

    /// Per-request timeout. A timed-out request is treated like any other failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Retries after the first failed fetch (mutations are never retried)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// How long the clients list stays fresh
    #[serde(default = "default_clients_stale_secs")]
    pub clients_stale_secs: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_clients_stale_secs() -> u64 {
    300
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            clients_stale_secs: default_clients_stale_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// One of `day`, `week`, `month`, `list`
    #[serde(default = "default_view")]
    pub default_view: String,

    /// Duration used when a create slot has no end
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,

    /// Start time (`HH:MM`) for all-day slots and the "new appointment" button
    #[serde(default = "default_start_time")]
    pub default_start_time: String,
}

fn default_view() -> String {
    "week".to_string()
}

fn default_duration_minutes() -> u32 {
    60
}

fn default_start_time() -> String {
    "09:00".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_view: default_view(),
            default_duration_minutes: default_duration_minutes(),
            default_start_time: default_start_time(),
        }
    }
}

impl CalendarConfig {
    /// Parsed `default_start_time`, falling back to 09:00 when malformed.
    pub fn start_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(&self.default_start_time, "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                token: None,
                timeout_secs: default_timeout_secs(),
            },
            query: QueryConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if missing.
    ///
    /// `CLINIC_API_TOKEN` fills in a missing token after the file is read and
    /// is never written back.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with_env_token(path, std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn load_with_env_token(path: &Path, env_token: Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))
                .context("Failed to parse config file")?
        } else {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        if config.api.token.is_none() {
            config.api.token = env_token;
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.timeout_secs == 0 {
            result.add_error("api.timeout_secs", "Timeout must be greater than 0");
        } else if self.api.timeout_secs > 300 {
            result.add_warning("api.timeout_secs", "Timeout is unusually long (>300s)");
        }

        if self.api.token.is_none() {
            result.add_warning(
                "api.token",
                "No API token configured - requests will be unauthenticated",
            );
        }

        if self.query.max_retries > 5 {
            result.add_warning("query.max_retries", "More than 5 retries delays error reporting");
        }

        if self.query.initial_delay_ms > self.query.max_delay_ms {
            result.add_error(
                "query.initial_delay_ms",
                "Initial delay must not exceed query.max_delay_ms",
            );
        }

        if !VIEW_NAMES.contains(&self.calendar.default_view.as_str()) {
            result.add_error(
                "calendar.default_view",
                format!(
                    "Unknown view '{}', expected one of {}",
                    self.calendar.default_view,
                    VIEW_NAMES.join(", ")
                ),
            );
        }

        if self.calendar.default_duration_minutes == 0 {
            result.add_error(
                "calendar.default_duration_minutes",
                "Default duration must be greater than 0",
            );
        }

        if NaiveTime::parse_from_str(&self.calendar.default_start_time, "%H:%M").is_err() {
            result.add_error(
                "calendar.default_start_time",
                format!("Expected HH:MM, got '{}'", self.calendar.default_start_time),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
