//! SQLite-backed durable tier.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::backend::{CacheBackend, CacheError, CacheResult};

/// Source of the current wall-clock time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Durable cache tier stored in a single SQLite table.
///
/// Expiry is checked on read; expired rows are misses until
/// [`purge_expired`](Self::purge_expired) removes them, which
/// [`ResultCache::connect`](super::ResultCache::connect) does once at startup.
pub struct SqliteCacheBackend {
    conn: Mutex<Connection>,
    clock: Clock,
}

impl SqliteCacheBackend {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Unavailable(format!("{}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| CacheError::Unavailable(format!("{}: {}", path.display(), e)))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
        "#,
        )?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS result_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
        "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock: system_clock(),
        })
    }

    /// Replace the clock used to stamp and check expiry.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now_ms(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }

    /// Delete expired rows, returning how many were removed.
    pub async fn purge_expired(&self) -> CacheResult<usize> {
        let now = self.now_ms();
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM result_cache WHERE expires_at <= ?",
            params![now],
        )?;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Number of stored rows, expired or not.
    pub async fn row_count(&self) -> CacheResult<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM result_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let now = self.now_ms();
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM result_cache WHERE key = ? AND expires_at > ?",
                params![key, now],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = self.now_ms().saturating_add(ttl_ms);
        let raw = serde_json::to_string(value)?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO result_cache (key, value, expires_at) VALUES (?, ?, ?)",
            params![key, raw, expires_at],
        )?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Clock whose time only moves when the test advances it.
    fn manual_clock() -> (Clock, Arc<StdMutex<DateTime<Utc>>>) {
        let now = Arc::new(StdMutex::new(Utc::now()));
        let handle = now.clone();
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    #[tokio::test]
    async fn test_round_trip_then_expire() {
        let (clock, now) = manual_clock();
        let cache = SqliteCacheBackend::open_in_memory()
            .unwrap()
            .with_clock(clock);

        let value = json!({"revenue_growth": 0.08});
        cache.set("analysis:ACME:2023", &value, DAY).await.unwrap();
        assert_eq!(cache.get("analysis:ACME:2023").await.unwrap(), Some(value));

        *now.lock().unwrap() += chrono::Duration::hours(23);
        assert!(cache.get("analysis:ACME:2023").await.unwrap().is_some());

        *now.lock().unwrap() += chrono::Duration::hours(1);
        assert_eq!(cache.get("analysis:ACME:2023").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_refreshes_expiry() {
        let (clock, now) = manual_clock();
        let cache = SqliteCacheBackend::open_in_memory()
            .unwrap()
            .with_clock(clock);

        cache.set("k", &json!(1), DAY).await.unwrap();
        *now.lock().unwrap() += chrono::Duration::hours(20);
        cache.set("k", &json!(2), DAY).await.unwrap();
        *now.lock().unwrap() += chrono::Duration::hours(20);

        assert_eq!(cache.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (clock, now) = manual_clock();
        let cache = SqliteCacheBackend::open_in_memory()
            .unwrap()
            .with_clock(clock);

        cache.set("old", &json!(1), Duration::from_secs(60)).await.unwrap();
        cache.set("new", &json!(2), DAY).await.unwrap();
        *now.lock().unwrap() += chrono::Duration::minutes(5);

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.row_count().await.unwrap(), 1);
        assert_eq!(cache.get("new").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        {
            let cache = SqliteCacheBackend::open(&path).unwrap();
            cache.ping().await.unwrap();
            cache.set("k", &json!("v"), DAY).await.unwrap();
        }

        let reopened = SqliteCacheBackend::open(&path).unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), Some(json!("v")));
    }
}
