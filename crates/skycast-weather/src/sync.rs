//! Cache-versus-network policy for weather queries.
//!
//! Current conditions are served from the [`RecordStore`] while younger than
//! [`CACHE_TTL`] and fetched otherwise; fresh readings are written back before
//! they are emitted. Forecasts always come from the network and are never
//! stored.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{RecordStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::error::{classify, ProviderError, WeatherError};
use crate::outcome::{Emitter, Outcome, ResultStream};
use crate::provider::RemoteClient;
use crate::types::{Coordinate, ForecastEntry, LocationKey, WeatherRecord};

/// How long a cached reading is served without contacting the provider.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Decides where weather data comes from and keeps the cache current.
///
/// Cheap to clone; clones share the same store and client. Holds no
/// per-location state, so one coordinator serves any number of coordinates
/// and concurrent tasks.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteClient>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, remote: Arc<dyn RemoteClient>) -> Self {
        Self::with_clock(store, remote, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                clock,
            }),
        }
    }

    /// Current conditions for `coord`.
    ///
    /// A fresh cache hit emits a single `Success`. Otherwise the stream emits
    /// `Loading`, then `Success` after the new reading is stored, or `Error`.
    /// Must be called from within a tokio runtime.
    pub fn get_current_weather(
        &self,
        coord: Coordinate,
        force_refresh: bool,
    ) -> ResultStream<WeatherRecord> {
        let (emitter, stream) = ResultStream::channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.current_weather(coord, force_refresh, emitter).await;
        });
        stream
    }

    /// Forecast periods for `coord`, in provider order.
    ///
    /// Always goes to the network; `force_refresh` is accepted for symmetry
    /// with [`get_current_weather`](Self::get_current_weather) and ignored.
    pub fn get_forecast(
        &self,
        coord: Coordinate,
        force_refresh: bool,
    ) -> ResultStream<Vec<ForecastEntry>> {
        let (emitter, stream) = ResultStream::channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if force_refresh {
                tracing::trace!("force_refresh has no effect on forecasts");
            }
            inner.forecast(coord, emitter).await;
        });
        stream
    }

    /// Fetch current conditions and overwrite the cache, without emitting anything.
    ///
    /// Follow with `get_current_weather(coord, true)` to observe the result
    /// through a stream.
    pub async fn refresh_weather(&self, coord: Coordinate) -> Result<WeatherRecord, WeatherError> {
        let key = coord.key();
        let api = self.inner.remote.fetch_current(coord).await.map_err(|e| {
            let error = classify(&e);
            tracing::error!("Weather refresh for {} failed: {}", key, error);
            error
        })?;

        let record = WeatherRecord::from_api(key, &api, self.inner.clock.now_millis());
        self.inner.store.put(&record).await.map_err(|e| {
            tracing::error!("Failed to store refreshed weather for {}: {}", record.key, e);
            WeatherError::unknown(format!("Failed to save weather: {}", e))
        })?;

        tracing::info!("Weather refreshed for {}", record.key);
        Ok(record)
    }

    /// Most recently stored reading for any location, regardless of age.
    pub async fn last_known_weather(&self) -> Option<WeatherRecord> {
        match self.inner.store.latest().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to read last known weather: {}", e);
                None
            }
        }
    }

    /// Drop the cached reading for `coord`.
    pub async fn evict(&self, coord: Coordinate) -> Result<(), StoreError> {
        let key = coord.key();
        self.inner.store.delete(&key).await?;
        tracing::debug!("Evicted cached weather for {}", key);
        Ok(())
    }
}

impl Inner {
    async fn current_weather(
        &self,
        coord: Coordinate,
        force_refresh: bool,
        emitter: Emitter<WeatherRecord>,
    ) {
        let key = coord.key();

        if !force_refresh {
            if let Some(record) = self.fresh_cached(&key).await {
                tracing::debug!("Returning cached weather for {}", key);
                emitter.emit(Outcome::Success(record)).await;
                return;
            }
        }

        if !emitter.emit(Outcome::Loading).await {
            return;
        }

        tracing::info!("Fetching current weather for {} from network", key);
        let fetched = tokio::select! {
            biased;
            _ = emitter.cancelled() => {
                tracing::debug!("Weather request for {} cancelled", key);
                return;
            }
            result = self.remote.fetch_current(coord) => result,
        };

        let api = match fetched {
            Ok(api) => api,
            Err(e) => {
                Self::emit_failure(&emitter, &key, &e).await;
                return;
            }
        };

        if emitter.is_cancelled() {
            tracing::debug!("Weather request for {} cancelled before caching", key);
            return;
        }

        let record = WeatherRecord::from_api(key, &api, self.clock.now_millis());
        if let Err(e) = self.store.put(&record).await {
            // The reading is still good; only the next lookup misses
            tracing::warn!("Failed to cache weather for {}: {}", record.key, e);
        }
        emitter.emit(Outcome::Success(record)).await;
    }

    async fn forecast(&self, coord: Coordinate, emitter: Emitter<Vec<ForecastEntry>>) {
        let key = coord.key();

        if !emitter.emit(Outcome::Loading).await {
            return;
        }

        tracing::info!("Fetching forecast for {} from network", key);
        let fetched = tokio::select! {
            biased;
            _ = emitter.cancelled() => {
                tracing::debug!("Forecast request for {} cancelled", key);
                return;
            }
            result = self.remote.fetch_forecast(coord) => result,
        };

        match fetched {
            Ok(api) => {
                let entries: Vec<ForecastEntry> =
                    api.list.iter().map(ForecastEntry::from_api).collect();
                tracing::debug!("Forecast for {} has {} periods", key, entries.len());
                emitter.emit(Outcome::Success(entries)).await;
            }
            Err(e) => Self::emit_failure(&emitter, &key, &e).await,
        }
    }

    /// Cached record for `key` if it is still fresh.
    ///
    /// Store faults count as a miss so a broken cache never blocks the network.
    async fn fresh_cached(&self, key: &LocationKey) -> Option<WeatherRecord> {
        match self.store.get(key).await {
            Ok(Some(record)) => {
                let now = self.clock.now_millis();
                if record.is_fresh(now, CACHE_TTL) {
                    Some(record)
                } else {
                    tracing::debug!(
                        "Cached weather for {} is stale ({} ms old)",
                        key,
                        record.age_millis(now)
                    );
                    None
                }
            }
            Ok(None) => {
                tracing::debug!("No cached weather for {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Cache read for {} failed, fetching from network: {}", key, e);
                None
            }
        }
    }

    async fn emit_failure<T>(emitter: &Emitter<T>, key: &LocationKey, e: &ProviderError) {
        let error = classify(e);
        tracing::error!("Weather request for {} failed: {}", key, error);
        emitter.emit(Outcome::Error(error)).await;
    }
}
