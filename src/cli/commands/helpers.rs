//! Construction of library services from settings.

use filingacquire::config::Settings;
use filingacquire::http_client::ResilientFetcher;
use filingacquire::rate_limit::RateLimiter;
use filingacquire::services::FilingDownloader;
use filingacquire::storage::FilingStore;

/// Build the fetcher. Fails before any request if no contact email is configured.
pub fn build_fetcher(settings: &Settings) -> anyhow::Result<ResilientFetcher> {
    let headers = settings.request_headers()?;
    let limiter = RateLimiter::with_config(settings.rate_limit_config());
    Ok(ResilientFetcher::new(
        limiter,
        headers,
        settings.retry_policy(),
        settings.request_timeout,
    )?)
}

pub fn build_downloader(settings: &Settings) -> anyhow::Result<FilingDownloader> {
    Ok(FilingDownloader::new(
        build_fetcher(settings)?,
        FilingStore::new(&settings.filings_dir),
    ))
}
