//! Persisted record store for current-weather readings.
//!
//! [`RecordStore`] is the async contract the coordinator depends on;
//! [`WeatherCache`] implements it on SQLite, one row per [`LocationKey`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::types::{LocationKey, WeatherRecord};

/// Storage-layer failure. Kept apart from [`WeatherError`](crate::error::WeatherError).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed store of the latest reading per location.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &LocationKey) -> StoreResult<Option<WeatherRecord>>;

    /// Insert or fully replace the record for `record.key`.
    async fn put(&self, record: &WeatherRecord) -> StoreResult<()>;

    async fn delete(&self, key: &LocationKey) -> StoreResult<()>;

    /// Most recently written record across all keys.
    async fn latest(&self) -> StoreResult<Option<WeatherRecord>>;

    /// Remove every record.
    async fn clear(&self) -> StoreResult<()>;
}

const SELECT_COLUMNS: &str = "id, city_name, temperature, feels_like, min_temp, max_temp, \
     pressure, humidity, description, icon, wind_speed, cloudiness, sunrise, sunset, last_updated";

/// SQLite-backed [`RecordStore`].
///
/// Blocking SQLite calls run on the tokio blocking pool.
#[derive(Clone)]
pub struct WeatherCache {
    conn: Arc<Mutex<Connection>>,
}

impl WeatherCache {
    /// Open (or create) the cache database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory cache (for testing).
    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather (
                id TEXT PRIMARY KEY,
                city_name TEXT NOT NULL,
                temperature REAL NOT NULL,
                feels_like REAL NOT NULL,
                min_temp REAL NOT NULL,
                max_temp REAL NOT NULL,
                pressure INTEGER NOT NULL,
                humidity INTEGER NOT NULL,
                description TEXT NOT NULL,
                icon TEXT NOT NULL,
                wind_speed REAL NOT NULL,
                cloudiness INTEGER NOT NULL,
                sunrise INTEGER NOT NULL,
                sunset INTEGER NOT NULL,
                last_updated INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_last_updated ON weather(last_updated DESC);
            "#,
        )
    }

    async fn with_conn<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let value = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&*conn)
        })
        .await??;
        Ok(value)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        Ok(WeatherRecord {
            key: LocationKey::from_stored(row.get(0)?),
            city_name: row.get(1)?,
            temperature: row.get(2)?,
            feels_like: row.get(3)?,
            min_temp: row.get(4)?,
            max_temp: row.get(5)?,
            pressure: row.get(6)?,
            humidity: row.get(7)?,
            description: row.get(8)?,
            icon: row.get(9)?,
            wind_speed: row.get(10)?,
            cloudiness: row.get(11)?,
            sunrise: row.get(12)?,
            sunset: row.get(13)?,
            last_updated: row.get(14)?,
        })
    }
}

#[async_trait]
impl RecordStore for WeatherCache {
    async fn get(&self, key: &LocationKey) -> StoreResult<Option<WeatherRecord>> {
        let id = key.as_str().to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM weather WHERE id = ?1"),
                params![id],
                Self::row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn put(&self, record: &WeatherRecord) -> StoreResult<()> {
        let key = record.key.clone();
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO weather
                (id, city_name, temperature, feels_like, min_temp, max_temp, pressure, humidity,
                 description, icon, wind_speed, cloudiness, sunrise, sunset, last_updated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    record.key.as_str(),
                    record.city_name,
                    record.temperature,
                    record.feels_like,
                    record.min_temp,
                    record.max_temp,
                    record.pressure,
                    record.humidity,
                    record.description,
                    record.icon,
                    record.wind_speed,
                    record.cloudiness,
                    record.sunrise,
                    record.sunset,
                    record.last_updated,
                ],
            )
            .map(|_| ())
        })
        .await?;
        tracing::debug!("Stored weather for {}", key);
        Ok(())
    }

    async fn delete(&self, key: &LocationKey) -> StoreResult<()> {
        let id = key.as_str().to_owned();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM weather WHERE id = ?1", params![id])
                .map(|_| ())
        })
        .await
    }

    async fn latest(&self) -> StoreResult<Option<WeatherRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM weather ORDER BY last_updated DESC LIMIT 1"),
                [],
                Self::row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.with_conn(|conn| conn.execute_batch("DELETE FROM weather;"))
            .await
    }
}
