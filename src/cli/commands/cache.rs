//! Result cache access.

use filingacquire::cache::{CacheKey, ResultCache};
use filingacquire::config::Settings;

async fn open_cache(settings: &Settings) -> anyhow::Result<ResultCache> {
    let cache = ResultCache::connect(&settings.cache_settings()?).await;
    if cache.is_degraded() {
        eprintln!("warning: durable cache unavailable, using in-memory cache");
    }
    Ok(cache)
}

pub async fn cmd_cache_get(
    settings: &Settings,
    namespace: &str,
    entity: &str,
    period: &str,
) -> anyhow::Result<()> {
    let cache = open_cache(settings).await?;
    let key = CacheKey::new(namespace, entity, period);

    let value = cache
        .get(key.as_str())
        .await
        .ok_or_else(|| anyhow::anyhow!("no cached value for {}", key))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn cmd_cache_set(
    settings: &Settings,
    namespace: &str,
    entity: &str,
    period: &str,
    value: &str,
) -> anyhow::Result<()> {
    let value: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| anyhow::anyhow!("value is not valid JSON: {}", e))?;

    let cache = open_cache(settings).await?;
    let key = CacheKey::new(namespace, entity, period);
    cache.set(key.as_str(), &value).await;

    println!(
        "Cached {} in {} (ttl {}h)",
        key,
        cache.backend_name(),
        cache.ttl().as_secs() / 3600
    );
    Ok(())
}
