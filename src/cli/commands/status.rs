//! Resolved settings display.

use serde_json::json;

use filingacquire::config::Settings;

pub fn cmd_status(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let limits = settings.rate_limit_config();
    let policy = settings.retry_policy();
    let cache = settings.cache_settings()?;
    let email = settings.contact_email().ok();

    if json {
        let status = json!({
            "data_dir": settings.data_dir,
            "filings_dir": settings.filings_dir,
            "contact_email": email,
            "client_id": settings.client_id,
            "rate_limit": {
                "requests_per_window": limits.requests_per_window,
                "window_ms": limits.window.as_millis() as u64,
            },
            "retry": {
                "max_retries": policy.max_retries,
                "base_delay_ms": policy.base_delay.as_millis() as u64,
                "max_backoff_ms": policy.max_backoff.as_millis() as u64,
            },
            "cache": {
                "backend": cache.target.to_string(),
                "ttl_secs": cache.ttl.as_secs(),
                "fallback_max_age_secs": cache.fallback_max_age.map(|d| d.as_secs()),
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Data directory:   {}", settings.data_dir.display());
    println!("Filings:          {}", settings.filings_dir.display());
    match email {
        Some(email) => println!("User-Agent:       {} {}", email, settings.client_id),
        None => println!("User-Agent:       (SEC_EMAIL not set; fetching disabled)"),
    }
    println!(
        "Rate limit:       {} requests per {:.3}s",
        limits.requests_per_window,
        limits.window.as_secs_f64()
    );
    println!(
        "Retries:          {} attempts, backoff {}s doubling to {}s",
        policy.max_retries,
        policy.base_delay.as_secs_f64(),
        policy.max_backoff.as_secs_f64()
    );
    println!("Result cache:     {}", cache.target);
    println!("Cache TTL:        {}h", cache.ttl.as_secs() / 3600);
    if let Some(max_age) = cache.fallback_max_age {
        println!("Fallback max age: {}h", max_age.as_secs() / 3600);
    }
    Ok(())
}
