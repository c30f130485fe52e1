//! OpenWeatherMap client.
//!
//! The client fetches and decodes; it never retries and never caches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ProviderError;
use crate::types::{ApiForecast, ApiWeather, Coordinate};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const UNITS: &str = "metric";
const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Network source of weather data.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn fetch_current(&self, coord: Coordinate) -> Result<ApiWeather, ProviderError>;

    async fn fetch_forecast(&self, coord: Coordinate) -> Result<ApiForecast, ProviderError>;
}

/// Error body returned by the provider on non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        Self::with_options(
            api_key,
            OPENWEATHER_BASE_URL,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_options(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        coord: Coordinate,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("units", UNITS.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            serde_json::from_slice(&body)
                .map_err(|e| ProviderError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else {
            let text = response.text().await.unwrap_or_default();
            // Prefer the provider's own explanation, e.g. "Invalid API key"
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|body| body.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown status")
                        .to_string()
                });
            tracing::debug!("Weather API returned status {}: {}", status, message);
            Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RemoteClient for WeatherProvider {
    #[instrument(skip(self), level = "info")]
    async fn fetch_current(&self, coord: Coordinate) -> Result<ApiWeather, ProviderError> {
        self.get_json("weather", coord).await
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(&self, coord: Coordinate) -> Result<ApiForecast, ProviderError> {
        self.get_json("forecast", coord).await
    }
}
