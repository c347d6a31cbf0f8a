//! Result cache tests
//!
//! Exercises tier selection and TTL behaviour through the public handle.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;

use filingacquire::cache::{
    CacheBackend, CacheKey, CacheSettings, CacheTarget, Clock, ResultCache, SqliteCacheBackend,
};

fn manual_clock() -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
    let now = Arc::new(Mutex::new(Utc::now()));
    let handle = now.clone();
    (Arc::new(move || *handle.lock().unwrap()), now)
}

#[tokio::test]
async fn durable_entries_expire_after_a_day() {
    let (clock, now) = manual_clock();
    let backend = SqliteCacheBackend::open_in_memory().unwrap().with_clock(clock);
    let settings = CacheSettings::new(CacheTarget::Memory);
    let cache = ResultCache::select(Ok(Arc::new(backend) as Arc<dyn CacheBackend>), &settings).await;

    assert!(!cache.is_degraded());
    assert_eq!(cache.backend_name(), "sqlite");

    let key = CacheKey::analysis("ACME", "2023");
    let value = json!({"summary": "steady growth", "score": 8});
    cache.set(key.as_str(), &value).await;
    assert_eq!(cache.get(key.as_str()).await, Some(value));

    *now.lock().unwrap() += ChronoDuration::hours(24);
    assert_eq!(cache.get(key.as_str()).await, None);
}

#[tokio::test]
async fn unreachable_durable_tier_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, "file").unwrap();

    let settings = CacheSettings::new(CacheTarget::Sqlite(blocker.join("cache.db")));
    let cache = ResultCache::connect(&settings).await;

    assert!(cache.is_degraded());
    assert_eq!(cache.backend_name(), "memory");

    let key = CacheKey::analysis("ACME", "2023");
    cache.set(key.as_str(), &json!([1, 2, 3])).await;
    assert_eq!(cache.get(key.as_str()).await, Some(json!([1, 2, 3])));
    assert_eq!(cache.get("analysis:ACME:2022").await, None);
}

#[tokio::test]
async fn sqlite_tier_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let settings = CacheSettings::new(CacheTarget::Sqlite(dir.path().join("cache.db")));

    let first = ResultCache::connect(&settings).await;
    first.set_as("analysis:ACME:2023", &vec!["a", "b"]).await;
    drop(first);

    let second = ResultCache::connect(&settings).await;
    assert_eq!(
        second.get_as::<Vec<String>>("analysis:ACME:2023").await,
        Some(vec!["a".to_string(), "b".to_string()])
    );
}
