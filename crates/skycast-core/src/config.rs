use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use skycast_weather::{Coordinate, DEFAULT_TIMEOUT_SECS, OPENWEATHER_BASE_URL};

use crate::location::is_valid_coordinate;

/// Environment variable consulted for the API key when none is configured.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const APP_DIR: &str = "skycast";
const CONFIG_FILE: &str = "config.toml";
const API_KEY_PLACEHOLDER: &str = "YOUR_OPENWEATHER_API_KEY";
const MAX_REASONABLE_TIMEOUT_SECS: u64 = 120;

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

    /// All errors joined into one line
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
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Local cache settings
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,

    /// Provider base URL, without a trailing endpoint
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Coordinate used when none is given
    pub default_latitude: f64,
    pub default_longitude: f64,

    /// Key taken from the environment at load time; never written back
    #[serde(skip)]
    env_api_key: Option<String>,
}

fn is_placeholder_key(key: &str) -> bool {
    key.trim().is_empty() || key.starts_with("YOUR_")
}

impl WeatherConfig {
    /// Key to send to the provider: the file's key, or the environment's
    /// when the file only holds a placeholder
    pub fn effective_api_key(&self) -> &str {
        match &self.env_api_key {
            Some(key) if is_placeholder_key(&self.api_key) => key,
            _ => &self.api_key,
        }
    }

    /// Remember a key from the environment. Empty values are ignored.
    pub fn set_env_api_key(&mut self, key: Option<String>) {
        self.env_api_key = key.filter(|k| !k.trim().is_empty());
    }

    /// Check if an API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !is_placeholder_key(self.effective_api_key())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_coordinate(&self) -> Coordinate {
        Coordinate::new(self.default_latitude, self.default_longitude)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            // Colombo
            default_latitude: 6.9271,
            default_longitude: 79.8612,
            env_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; relative paths resolve against the config directory
    pub database_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from("weather.db"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    ///
    /// `OPENWEATHER_API_KEY` stands in for an empty or placeholder key in the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config
            .weather
            .set_env_api_key(std::env::var(API_KEY_ENV).ok());

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::validated(Self::load()?)
    }

    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        Self::validated(Self::load_from(path)?)
    }

    fn validated(config: Self) -> Result<(Self, ValidationResult)> {
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > MAX_REASONABLE_TIMEOUT_SECS {
            result.add_warning(
                "weather.timeout_secs",
                format!(
                    "Timeout is unusually long (>{} seconds)",
                    MAX_REASONABLE_TIMEOUT_SECS
                ),
            );
        }

        if !is_valid_coordinate(self.weather.default_latitude, 0.0) {
            result.add_error(
                "weather.default_latitude",
                format!(
                    "Latitude must be between -90 and 90, got {}",
                    self.weather.default_latitude
                ),
            );
        }

        if !is_valid_coordinate(0.0, self.weather.default_longitude) {
            result.add_error(
                "weather.default_longitude",
                format!(
                    "Longitude must be between -180 and 180, got {}",
                    self.weather.default_longitude
                ),
            );
        }

        if !self.weather.is_configured() {
            result.add_warning(
                "weather.api_key",
                format!(
                    "API key not configured - set it here or via {}",
                    API_KEY_ENV
                ),
            );
        }

        if self.storage.database_file.as_os_str().is_empty() {
            result.add_error("storage.database_file", "Database file must not be empty");
        }

        result
    }

    /// Validate a URL field
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

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Absolute path of the SQLite cache file
    pub fn database_path(&self) -> PathBuf {
        if self.storage.database_file.is_absolute() {
            self.storage.database_file.clone()
        } else {
            self.config_dir.join(&self.storage.database_file)
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join(CONFIG_FILE))
    }
}
