//! The coordinate the user is currently looking at.

use skycast_weather::Coordinate;
use thiserror::Error;

use crate::config::WeatherConfig;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Invalid coordinate: {latitude}, {longitude}")]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// True if latitude is within ±90 and longitude within ±180.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Selected location, seeded from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedLocation {
    coordinate: Coordinate,
}

impl SelectedLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(config.default_coordinate())
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Move to a new coordinate. Returns whether the location changed.
    pub fn update(&mut self, latitude: f64, longitude: f64) -> Result<bool, InvalidCoordinate> {
        if !is_valid_coordinate(latitude, longitude) {
            return Err(InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        let next = Coordinate::new(latitude, longitude);
        if next.key() == self.coordinate.key() {
            return Ok(false);
        }

        tracing::info!("Location updated: {} -> {}", self.coordinate, next);
        self.coordinate = next;
        Ok(true)
    }
}
