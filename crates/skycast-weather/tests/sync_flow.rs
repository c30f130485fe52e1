//! End-to-end coordinator behaviour against a mocked OpenWeatherMap server
//! and a file-backed cache.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use skycast_weather::{
    Coordinate, ErrorKind, ManualClock, Outcome, RecordStore, SyncCoordinator, WeatherCache,
    WeatherError, WeatherProvider, WeatherRecord,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_760_600_000_000;

fn colombo() -> Coordinate {
    Coordinate::new(6.9271, 79.8612)
}

fn current_body(city: &str, temp: f64) -> serde_json::Value {
    json!({
        "coord": {"lat": 6.9271, "lon": 79.8612},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {
            "temp": temp,
            "feels_like": temp + 2.0,
            "temp_min": temp - 0.5,
            "temp_max": temp + 0.5,
            "pressure": 1011,
            "humidity": 65
        },
        "wind": {"speed": 2.6, "deg": 90},
        "clouds": {"all": 5},
        "sys": {"sunrise": 1_760_574_120, "sunset": 1_760_617_380},
        "name": city,
        "dt": 1_760_599_000
    })
}

fn forecast_body() -> serde_json::Value {
    let item = |dt: i64, temp: f64| {
        json!({
            "dt": dt,
            "main": {
                "temp": temp,
                "feels_like": temp,
                "temp_min": temp - 1.0,
                "temp_max": temp + 1.0,
                "pressure": 1010,
                "humidity": 80
            },
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10n"}],
            "wind": {"speed": 3.4, "deg": 210},
            "clouds": {"all": 90}
        })
    };
    json!({
        "cod": "200",
        "cnt": 3,
        "list": [
            item(1_760_605_200, 27.1),
            item(1_760_616_000, 26.4),
            item(1_760_626_800, 25.9)
        ],
        "city": {"name": "Colombo", "coord": {"lat": 6.9271, "lon": 79.8612}}
    })
}

struct Setup {
    server: MockServer,
    cache: WeatherCache,
    coordinator: SyncCoordinator,
    _dir: TempDir,
}

async fn setup() -> Setup {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cache = WeatherCache::new(dir.path().join("weather.db")).unwrap();
    let provider =
        WeatherProvider::with_options("test_key", &server.uri(), Duration::from_secs(5)).unwrap();
    let coordinator = SyncCoordinator::with_clock(
        Arc::new(cache.clone()),
        Arc::new(provider),
        Arc::new(ManualClock::new(NOW)),
    );
    Setup {
        server,
        cache,
        coordinator,
        _dir: dir,
    }
}

async fn seed(cache: &WeatherCache, city: &str, last_updated: i64) -> WeatherRecord {
    let api = serde_json::from_value(current_body(city, 18.0)).unwrap();
    let record = WeatherRecord::from_api(colombo().key(), &api, last_updated);
    cache.put(&record).await.unwrap();
    record
}

async fn drain<T>(mut stream: skycast_weather::ResultStream<T>) -> Vec<Outcome<T>> {
    let mut outcomes = Vec::new();
    while let Some(outcome) = stream.next().await {
        outcomes.push(outcome);
    }
    outcomes
}

#[tokio::test]
async fn fresh_cache_is_served_without_request() {
    let s = setup().await;
    let cached = seed(&s.cache, "Cached", NOW - 500_000).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Colombo", 30.0)))
        .expect(0)
        .mount(&s.server)
        .await;

    let outcomes = drain(s.coordinator.get_current_weather(colombo(), false)).await;

    assert_eq!(outcomes, vec![Outcome::Success(cached)]);
}

#[tokio::test]
async fn stale_cache_is_replaced_by_network_reading() {
    let s = setup().await;
    seed(&s.cache, "Cached", NOW - 700_000).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "6.9271"))
        .and(query_param("lon", "79.8612"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Colombo", 30.0)))
        .expect(1)
        .mount(&s.server)
        .await;

    let outcomes = drain(s.coordinator.get_current_weather(colombo(), false)).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_loading());
    let fresh = outcomes[1].success().unwrap();
    assert_eq!(fresh.city_name, "Colombo");
    assert_eq!(fresh.temperature, 30.0);
    assert_eq!(fresh.last_updated, NOW);

    let stored = s.cache.get(&colombo().key()).await.unwrap().unwrap();
    assert_eq!(&stored, fresh);
}

#[tokio::test]
async fn server_error_is_reported_and_cache_kept() {
    let s = setup().await;
    let cached = seed(&s.cache, "Cached", NOW - 700_000).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&s.server)
        .await;

    let outcomes = drain(s.coordinator.get_current_weather(colombo(), false)).await;

    assert_eq!(
        outcomes,
        vec![
            Outcome::Loading,
            Outcome::Error(WeatherError::Server {
                code: 503,
                message: "Service Unavailable".to_string()
            })
        ]
    );
    assert_eq!(s.cache.get(&colombo().key()).await.unwrap(), Some(cached));
}

#[tokio::test]
async fn invalid_api_key_surfaces_provider_message() {
    let s = setup().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "cod": 401,
            "message": "Invalid API key"
        })))
        .mount(&s.server)
        .await;

    let outcome = s
        .coordinator
        .get_current_weather(colombo(), true)
        .terminal()
        .await
        .unwrap();

    let error = outcome.error().unwrap();
    assert_eq!(error.status_code(), Some(401));
    assert_eq!(error.message(), "Invalid API key");
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn unparseable_body_is_unknown_error() {
    let s = setup().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&s.server)
        .await;

    let outcome = s
        .coordinator
        .get_current_weather(colombo(), true)
        .terminal()
        .await
        .unwrap();

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Unknown));
    assert!(s.cache.get(&colombo().key()).await.unwrap().is_none());
}

#[tokio::test]
async fn forecast_hits_network_every_time() {
    let s = setup().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(2)
        .mount(&s.server)
        .await;

    for _ in 0..2 {
        let outcomes = drain(s.coordinator.get_forecast(colombo(), false)).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_loading());
        let entries = outcomes[1].success().unwrap();
        let dates: Vec<i64> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![1_760_605_200, 1_760_616_000, 1_760_626_800]);
        assert_eq!(entries[0].description, "light rain");
    }

    assert!(s.cache.latest().await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_then_forced_query() {
    let s = setup().await;
    seed(&s.cache, "Cached", NOW - 1_000).await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Colombo", 31.0)))
        .expect(2)
        .mount(&s.server)
        .await;

    let refreshed = s.coordinator.refresh_weather(colombo()).await.unwrap();
    assert_eq!(refreshed.temperature, 31.0);
    assert_eq!(
        s.coordinator.last_known_weather().await.unwrap().city_name,
        "Colombo"
    );

    let outcome = s
        .coordinator
        .get_current_weather(colombo(), true)
        .terminal()
        .await
        .unwrap();
    assert_eq!(outcome.success().unwrap().temperature, 31.0);
}
