use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Separator between latitude and longitude in a [`LocationKey`].
pub const KEY_SEPARATOR: char = '_';

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Cache identity for this coordinate.
    pub fn key(&self) -> LocationKey {
        LocationKey::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Primary key of a cached weather reading.
///
/// Built from the exact textual form of latitude and longitude. No rounding is
/// applied, so `6.93` and `6.930001` are different locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self(format!(
            "{}{}{}",
            unsigned_zero(latitude),
            KEY_SEPARATOR,
            unsigned_zero(longitude)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a key read back from storage.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }
}

// -0.0 == 0.0, so both must render the same key
fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Current conditions for one location, as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub key: LocationKey,
    pub city_name: String,
    /// Degrees Celsius
    pub temperature: f64,
    pub feels_like: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    /// hPa
    pub pressure: i32,
    /// Percent
    pub humidity: i32,
    pub description: String,
    pub icon: String,
    /// Meters per second
    pub wind_speed: f64,
    /// Cloud cover percent
    pub cloudiness: i32,
    /// Epoch seconds
    pub sunrise: i64,
    /// Epoch seconds
    pub sunset: i64,
    /// Epoch milliseconds of the cache write, never the provider's observation time
    pub last_updated: i64,
}

impl WeatherRecord {
    /// Build a record from a provider response, stamped with the write-time clock.
    pub fn from_api(key: LocationKey, api: &ApiWeather, written_at_millis: i64) -> Self {
        let (description, icon) = primary_condition(&api.weather);

        Self {
            key,
            city_name: api.name.clone(),
            temperature: api.main.temp,
            feels_like: api.main.feels_like,
            min_temp: api.main.temp_min,
            max_temp: api.main.temp_max,
            pressure: api.main.pressure,
            humidity: api.main.humidity,
            description,
            icon,
            wind_speed: api.wind.speed,
            cloudiness: api.clouds.all,
            sunrise: api.sys.sunrise,
            sunset: api.sys.sunset,
            last_updated: written_at_millis,
        }
    }

    /// Milliseconds since this record was written. Negative if the clock went backwards.
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.last_updated
    }

    /// Whether the record is younger than `ttl` at `now_millis`.
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now_millis) < ttl_millis
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_updated)
    }

    pub fn sunrise_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sunrise, 0)
    }

    pub fn sunset_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sunset, 0)
    }
}

/// One forecast period. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Period start, epoch seconds
    pub date: i64,
    pub temperature: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub description: String,
    pub icon: String,
    pub humidity: i32,
    pub wind_speed: f64,
}

impl ForecastEntry {
    pub fn from_api(item: &ApiForecastItem) -> Self {
        let (description, icon) = primary_condition(&item.weather);

        Self {
            date: item.dt,
            temperature: item.main.temp,
            min_temp: item.main.temp_min,
            max_temp: item.main.temp_max,
            description,
            icon,
            humidity: item.main.humidity,
            wind_speed: item.wind.speed,
        }
    }

    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }
}

/// Description and icon of the first reported condition, empty if none.
fn primary_condition(conditions: &[ApiCondition]) -> (String, String) {
    conditions
        .first()
        .map(|c| (c.description.clone(), c.icon.clone()))
        .unwrap_or_default()
}

/// Provider response for current conditions.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiWeather {
    pub coord: ApiCoord,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
    pub main: ApiMain,
    pub wind: ApiWind,
    pub clouds: ApiClouds,
    pub sys: ApiSys,
    pub name: String,
    /// Observation time, epoch seconds
    pub dt: i64,
}

/// Provider response for the multi-period forecast.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecast {
    pub list: Vec<ApiForecastItem>,
    pub city: ApiCity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecastItem {
    pub dt: i64,
    pub main: ApiMain,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
    pub wind: ApiWind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCity {
    pub name: String,
    pub coord: ApiCoord,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApiCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiClouds {
    pub all: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSys {
    pub sunrise: i64,
    pub sunset: i64,
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_location_key_format() {
        let key = LocationKey::new(6.9271, 79.8612);
        assert_eq!(key.as_str(), "6.9271_79.8612");
        assert_eq!(Coordinate::new(6.9271, 79.8612).key(), key);
    }

    #[test]
    fn test_location_key_equal_values_match() {
        assert_eq!(LocationKey::new(10.5, -3.25), LocationKey::new(10.50, -3.250));
        assert_eq!(LocationKey::new(0.0, 1.0), LocationKey::new(-0.0, 1.0));
    }

    #[test]
    fn test_location_key_is_not_normalized() {
        assert_ne!(LocationKey::new(6.9271, 79.8612), LocationKey::new(6.92710001, 79.8612));
    }

    #[test]
    fn test_record_from_api_copies_every_field() {
        let api = fixtures::current("Colombo", 29.0);
        let record = WeatherRecord::from_api(LocationKey::new(6.9271, 79.8612), &api, 42);

        assert_eq!(record.key.as_str(), "6.9271_79.8612");
        assert_eq!(record.city_name, "Colombo");
        assert_eq!(record.temperature, 29.0);
        assert_eq!(record.feels_like, 32.5);
        assert_eq!(record.min_temp, 28.0);
        assert_eq!(record.max_temp, 30.0);
        assert_eq!(record.pressure, 1009);
        assert_eq!(record.humidity, 78);
        assert_eq!(record.description, "scattered clouds");
        assert_eq!(record.icon, "03d");
        assert_eq!(record.wind_speed, 4.12);
        assert_eq!(record.cloudiness, 40);
        assert_eq!(record.sunrise, 1_760_574_120);
        assert_eq!(record.sunset, 1_760_617_380);
    }

    #[test]
    fn test_record_uses_write_time_not_observation_time() {
        let api = fixtures::current("Colombo", 29.0);
        let record = WeatherRecord::from_api(LocationKey::new(1.0, 2.0), &api, 1_760_600_123_456);
        assert_eq!(record.last_updated, 1_760_600_123_456);
        assert_ne!(record.last_updated, api.dt * 1000);
    }

    #[test]
    fn test_missing_conditions_give_empty_description() {
        let mut api = fixtures::current("Nowhere", 10.0);
        api.weather.clear();
        let record = WeatherRecord::from_api(LocationKey::new(1.0, 2.0), &api, 0);
        assert_eq!(record.description, "");
        assert_eq!(record.icon, "");
    }

    #[test]
    fn test_freshness_boundary() {
        let api = fixtures::current("Colombo", 29.0);
        let record = WeatherRecord::from_api(LocationKey::new(1.0, 2.0), &api, 1_000_000);
        let ttl = Duration::from_secs(600);

        assert!(record.is_fresh(1_000_000 + 500_000, ttl));
        assert!(record.is_fresh(1_000_000 + 599_999, ttl));
        assert!(!record.is_fresh(1_000_000 + 600_000, ttl));
        assert!(!record.is_fresh(1_000_000 + 700_000, ttl));
        assert_eq!(record.age_millis(1_000_250), 250);
    }

    #[test]
    fn test_record_time_helpers() {
        let api = fixtures::current("Colombo", 29.0);
        let record = WeatherRecord::from_api(LocationKey::new(1.0, 2.0), &api, 1_760_600_000_000);
        assert_eq!(record.sunrise_time().unwrap().timestamp(), 1_760_574_120);
        assert_eq!(record.sunset_time().unwrap().timestamp(), 1_760_617_380);
        assert_eq!(record.updated_at().unwrap().timestamp_millis(), 1_760_600_000_000);
    }

    #[test]
    fn test_forecast_entries_keep_provider_order() {
        let api = fixtures::forecast(&[1_760_605_200, 1_760_616_000, 1_760_626_800]);
        let entries: Vec<ForecastEntry> = api.list.iter().map(ForecastEntry::from_api).collect();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].date, 1_760_605_200);
        assert_eq!(entries[2].date, 1_760_626_800);
        assert_eq!(entries[1].temperature, 28.0);
        assert_eq!(entries[1].humidity, 71);
        assert_eq!(entries[0].description, "light rain");
        assert_eq!(entries[0].icon, "10d");
        assert_eq!(entries[0].period_start().unwrap().timestamp(), 1_760_605_200);
    }

    #[test]
    fn test_api_weather_rejects_missing_main() {
        let mut json = fixtures::current_json("Colombo", 29.0);
        json.as_object_mut().unwrap().remove("main");
        assert!(serde_json::from_value::<ApiWeather>(json).is_err());
    }
}
