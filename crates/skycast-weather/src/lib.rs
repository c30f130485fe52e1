//! Weather data sync for SkyCast
//!
//! Fetches current conditions and forecasts from OpenWeatherMap, keeps the
//! latest reading per location in a SQLite cache, and reports progress as
//! Loading / Success / Error streams.

pub mod cache;
pub mod clock;
pub mod error;
pub mod outcome;
pub mod provider;
pub mod sync;
pub mod types;

pub use cache::{RecordStore, StoreError, StoreResult, WeatherCache};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use error::{classify, ErrorKind, ProviderError, WeatherError};
pub use outcome::{Outcome, ResultStream};
pub use provider::{RemoteClient, WeatherProvider, DEFAULT_TIMEOUT_SECS, OPENWEATHER_BASE_URL};
pub use sync::{SyncCoordinator, CACHE_TTL};
pub use types::*;
