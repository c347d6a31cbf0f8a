//! Two-tier cache for derived analysis results.
//!
//! A durable tier (SQLite or Redis) with a TTL is selected once at startup.
//! If it cannot be reached, the cache silently degrades to an in-process
//! tier. Callers only see [`ResultCache`] and never receive backend errors.

mod backend;
mod memory;
#[cfg(feature = "redis-backend")]
mod redis;
mod sqlite;

pub use backend::{CacheBackend, CacheError, CacheResult};
pub use memory::MemoryCacheBackend;
#[cfg(feature = "redis-backend")]
pub use redis::RedisCacheBackend;
pub use sqlite::{Clock, SqliteCacheBackend};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Lifetime of durable-tier entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Namespace used for analysis results.
pub const ANALYSIS_NAMESPACE: &str = "analysis";

/// Cache key of the form `<namespace>:<entity>:<period>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, entity: &str, period: &str) -> Self {
        Self(format!("{}:{}:{}", namespace, entity, period))
    }

    pub fn analysis(entity: &str, period: &str) -> Self {
        Self::new(ANALYSIS_NAMESPACE, entity, period)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which durable tier to try at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTarget {
    Sqlite(PathBuf),
    Redis(String),
    /// Skip the durable tier entirely.
    Memory,
}

impl CacheTarget {
    /// Parse a backend selector.
    ///
    /// Accepts `sqlite`, `sqlite:<path>`, `redis://...`, `rediss://...` and
    /// `memory`. Plain `sqlite` resolves to `default_sqlite`.
    pub fn parse(value: &str, default_sqlite: &Path) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("sqlite") {
            return Some(CacheTarget::Sqlite(default_sqlite.to_path_buf()));
        }
        if value.eq_ignore_ascii_case("memory") {
            return Some(CacheTarget::Memory);
        }
        if value.starts_with("redis://") || value.starts_with("rediss://") {
            return Some(CacheTarget::Redis(value.to_string()));
        }
        value
            .strip_prefix("sqlite:")
            .filter(|path| !path.is_empty())
            .map(|path| CacheTarget::Sqlite(PathBuf::from(path)))
    }
}

impl fmt::Display for CacheTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTarget::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
            CacheTarget::Redis(url) => f.write_str(url),
            CacheTarget::Memory => f.write_str("memory"),
        }
    }
}

/// Resolved cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub target: CacheTarget,
    pub ttl: Duration,
    /// Optional age bound for the in-process tier.
    pub fallback_max_age: Option<Duration>,
    pub connect_timeout: Duration,
}

impl CacheSettings {
    pub fn new(target: CacheTarget) -> Self {
        Self {
            target,
            ttl: DEFAULT_TTL,
            fallback_max_age: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to whichever cache tier was selected at startup.
#[derive(Clone)]
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    degraded: bool,
}

impl ResultCache {
    /// Connect to the configured durable tier, degrading to memory on failure.
    pub async fn connect(settings: &CacheSettings) -> Self {
        let durable: CacheResult<Arc<dyn CacheBackend>> = match &settings.target {
            CacheTarget::Memory => {
                debug!("Result cache configured for in-memory storage");
                return Self::in_memory_with(settings.ttl, settings.fallback_max_age);
            }
            CacheTarget::Sqlite(path) => match SqliteCacheBackend::open(path) {
                Ok(backend) => {
                    if let Err(e) = backend.purge_expired().await {
                        warn!("Could not purge expired cache entries: {}", e);
                    }
                    Ok(Arc::new(backend) as Arc<dyn CacheBackend>)
                }
                Err(e) => Err(e),
            },
            #[cfg(feature = "redis-backend")]
            CacheTarget::Redis(url) => RedisCacheBackend::connect(url, settings.connect_timeout)
                .await
                .map(|b| Arc::new(b) as Arc<dyn CacheBackend>),
            #[cfg(not(feature = "redis-backend"))]
            CacheTarget::Redis(url) => Err(CacheError::Unavailable(format!(
                "{} requires the redis-backend feature",
                url
            ))),
        };

        Self::select(durable, settings).await
    }

    /// Use `durable` if it was opened and answers a ping, else the memory tier.
    pub async fn select(durable: CacheResult<Arc<dyn CacheBackend>>, settings: &CacheSettings) -> Self {
        let checked = match durable {
            Ok(backend) => backend.ping().await.map(|_| backend),
            Err(e) => Err(e),
        };

        match checked {
            Ok(backend) => {
                info!("Result cache using {} backend", backend.name());
                Self {
                    backend,
                    ttl: settings.ttl,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(
                    "Durable result cache unavailable ({}), falling back to in-memory cache",
                    e
                );
                Self {
                    degraded: true,
                    ..Self::in_memory_with(settings.ttl, settings.fallback_max_age)
                }
            }
        }
    }

    /// Cache backed only by the in-process tier.
    pub fn in_memory() -> Self {
        Self::in_memory_with(DEFAULT_TTL, None)
    }

    fn in_memory_with(ttl: Duration, max_age: Option<Duration>) -> Self {
        Self {
            backend: Arc::new(MemoryCacheBackend::with_max_age(max_age)),
            ttl,
            degraded: false,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether the durable tier was configured but could not be used.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`. Backend failures are logged and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.backend.get(key).await {
            Ok(value) => {
                debug!("Cache {} for {}", if value.is_some() { "hit" } else { "miss" }, key);
                value
            }
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                None
            }
        }
    }

    /// Store `value` under `key`. Backend failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &Value) {
        if let Err(e) = self.backend.set(key, value, self.ttl).await {
            warn!("Cache write for {} failed: {}", key, e);
        }
    }

    /// Typed lookup; a value that does not deserialize is a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Cached value for {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, &value).await,
            Err(e) => warn!("Could not serialize cache value for {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Unreachable;

    #[async_trait]
    impl CacheBackend for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn ping(&self) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    fn settings() -> CacheSettings {
        CacheSettings::new(CacheTarget::Memory)
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(CacheKey::analysis("ACME", "2023").to_string(), "analysis:ACME:2023");
        assert_eq!(CacheKey::new("ns", "e", "p").as_str(), "ns:e:p");
    }

    #[test]
    fn test_parse_target() {
        let default = Path::new("/data/cache.db");
        assert_eq!(
            CacheTarget::parse("sqlite", default),
            Some(CacheTarget::Sqlite(default.to_path_buf()))
        );
        assert_eq!(
            CacheTarget::parse("sqlite:/tmp/c.db", default),
            Some(CacheTarget::Sqlite(PathBuf::from("/tmp/c.db")))
        );
        assert_eq!(
            CacheTarget::parse("redis://localhost:6379", default),
            Some(CacheTarget::Redis("redis://localhost:6379".into()))
        );
        assert_eq!(CacheTarget::parse("MEMORY", default), Some(CacheTarget::Memory));
        assert_eq!(CacheTarget::parse("memcached://x", default), None);
        assert_eq!(CacheTarget::parse("sqlite:", default), None);
    }

    #[tokio::test]
    async fn test_unreachable_at_startup_degrades() {
        let cache = ResultCache::select(Ok(Arc::new(Unreachable) as Arc<dyn CacheBackend>), &settings()).await;
        assert!(cache.is_degraded());
        assert_eq!(cache.backend_name(), "memory");

        cache.set("analysis:ACME:2023", &json!({"score": 7})).await;
        assert_eq!(cache.get("analysis:ACME:2023").await, Some(json!({"score": 7})));
    }

    #[tokio::test]
    async fn test_open_failure_degrades() {
        let cache = ResultCache::select(
            Err(CacheError::Unavailable("no such host".into())),
            &settings(),
        )
        .await;
        assert!(cache.is_degraded());
        cache.set("k", &json!(1)).await;
        assert_eq!(cache.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_runtime_failures_are_misses() {
        let cache = ResultCache {
            backend: Arc::new(Unreachable),
            ttl: DEFAULT_TTL,
            degraded: false,
        };
        cache.set("k", &json!(1)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_typed_access() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Summary {
            ticker: String,
            growth: f64,
        }

        let cache = ResultCache::in_memory();
        let key = CacheKey::analysis("ACME", "2023");
        let summary = Summary {
            ticker: "ACME".into(),
            growth: 0.12,
        };

        cache.set_as(key.as_str(), &summary).await;
        assert_eq!(cache.get_as::<Summary>(key.as_str()).await, Some(summary));
        assert_eq!(cache.get_as::<Vec<u8>>(key.as_str()).await, None);
    }

    #[tokio::test]
    async fn test_connect_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::connect(&CacheSettings::new(CacheTarget::Sqlite(
            dir.path().join("cache.db"),
        )))
        .await;
        assert!(!cache.is_degraded());
        assert_eq!(cache.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn test_connect_sqlite_purges_expired_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let two_days_ago = chrono::Utc::now() - chrono::Duration::days(2);
            let stale = SqliteCacheBackend::open(&path)
                .unwrap()
                .with_clock(Arc::new(move || two_days_ago));
            stale.set("analysis:OLD:2019", &json!(1), DEFAULT_TTL).await.unwrap();
            stale.set("analysis:NEW:2023", &json!(2), DEFAULT_TTL * 3).await.unwrap();
            assert_eq!(stale.row_count().await.unwrap(), 2);
        }

        let cache = ResultCache::connect(&CacheSettings::new(CacheTarget::Sqlite(path.clone()))).await;
        assert!(!cache.is_degraded());
        assert_eq!(cache.get("analysis:NEW:2023").await, Some(json!(2)));

        let reopened = SqliteCacheBackend::open(&path).unwrap();
        assert_eq!(reopened.row_count().await.unwrap(), 1);
    }
}
