//! Application-level error types for SkyCast.
//!
//! Library errors from the weather crate convert into [`AppError`], which
//! adds `user_message()` for anything shown to a person.

use skycast_weather::{classify, ProviderError, StoreError, WeatherError};
use thiserror::Error;

use crate::location::InvalidCoordinate;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Weather client error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Location(#[from] InvalidCoordinate),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Storage(StoreError::Database(_)) => {
                "Unable to access saved weather. Try restarting the app."
            }
            AppError::Storage(StoreError::Task(_)) => "A data operation failed. Please try again.",
            AppError::Provider(e) => classify(e).user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Location(_) => "That location is not valid. Check the coordinates.",
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}
