//! Redis-backed durable tier.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use super::backend::{CacheBackend, CacheError, CacheResult};

/// Durable cache tier using Redis `SETEX` for expiry.
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to Redis, failing if no connection is made within `timeout`.
    pub async fn connect(redis_url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Unavailable(format!("Redis connection error: {}", e)))?;

        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Unavailable(format!("Redis connect to {} timed out", redis_url)))?
            .map_err(|e| {
                CacheError::Unavailable(format!("Redis connection manager error: {}", e))
            })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, raw, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
