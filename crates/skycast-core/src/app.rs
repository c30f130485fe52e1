use anyhow::Result;
use std::sync::Arc;

use skycast_weather::{Coordinate, SyncCoordinator, WeatherCache, WeatherProvider};

use crate::error::{AppError, ConfigError};
use crate::location::SelectedLocation;
use crate::Config;

/// Main application state: configuration plus the wired weather services
pub struct App {
    config: Arc<Config>,
    coordinator: SyncCoordinator,
    location: SelectedLocation,
}

impl App {
    /// Create a new application instance from the user's config file
    pub fn new() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        Ok(Self::from_config(config)?)
    }

    /// Build the cache, provider and coordinator described by `config`
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        std::fs::create_dir_all(&config.config_dir)?;

        let db_path = config.database_path();
        tracing::info!("Opening weather cache at {}", db_path.display());
        let cache = WeatherCache::new(&db_path)?;

        let provider = WeatherProvider::with_options(
            config.weather.effective_api_key(),
            &config.weather.base_url,
            config.weather.timeout(),
        )?;

        let coordinator = SyncCoordinator::new(Arc::new(cache), Arc::new(provider));
        let location = SelectedLocation::from_config(&config.weather);

        tracing::info!("Application initialized for {}", location.coordinate());
        Ok(Self {
            config: Arc::new(config),
            coordinator,
            location,
        })
    }

    /// Shutdown the application
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Weather coordinator; clones share the same cache and client
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    pub fn location(&self) -> Coordinate {
        self.location.coordinate()
    }

    /// Change the selected location. Returns whether it changed.
    pub fn set_location(&mut self, latitude: f64, longitude: f64) -> Result<bool, AppError> {
        Ok(self.location.update(latitude, longitude)?)
    }
}
