//! Storage backend trait for the result cache.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value storage for cached results.
///
/// `ttl` is advisory: backends that do not expire entries ignore it.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()>;

    /// Check the backend is reachable.
    async fn ping(&self) -> CacheResult<()>;
}
