//! In-process fallback tier.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::backend::{CacheBackend, CacheResult};

/// In-memory cache used when no durable tier is reachable.
///
/// Entries ignore the per-call TTL. With `max_age` set, entries older than
/// that are treated as misses and dropped on the next read.
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
    max_age: Option<Duration>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::with_max_age(None)
    }

    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn is_stale(&self, stored_at: Instant) -> bool {
        self.max_age
            .is_some_and(|max_age| stored_at.elapsed() >= max_age)
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, stored_at)) if !self.is_stale(*stored_at) => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|(_, stored_at)| self.is_stale(*stored_at))
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Value, _ttl: Duration) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.clone(), Instant::now()));
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}
