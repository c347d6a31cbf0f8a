//! Locating a company's filings in the master indexes and storing them.

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::edgar::{master_index_urls, parse_master_index, select_filings};
use crate::http_client::{FetchError, FetchResult, ResilientFetcher};
use crate::models::{FilingRef, IndexEntry};
use crate::storage::{FilingKey, FilingLocator, FilingStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DownloadResult<T> = Result<T, DownloadError>;

/// Finds filings through the master indexes and persists them.
#[derive(Clone)]
pub struct FilingDownloader {
    fetcher: ResilientFetcher,
    store: FilingStore,
}

impl FilingDownloader {
    pub fn new(fetcher: ResilientFetcher, store: FilingStore) -> Self {
        Self { fetcher, store }
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    pub fn store(&self) -> &FilingStore {
        &self.store
    }

    /// Fetch and parse one master index.
    pub async fn fetch_index(&self, url: &str) -> FetchResult<Vec<IndexEntry>> {
        let text = self.fetcher.fetch_text(url).await?;
        let entries = parse_master_index(&text);
        info!("Parsed {} entries from {}", entries.len(), url);
        Ok(entries)
    }

    /// Latest `years` filings of `form_type` for `cik`, searching the
    /// master indexes of the last `years` calendar years.
    pub async fn find_filings(&self, cik: &str, years: u32, form_type: &str) -> Vec<FilingRef> {
        self.find_filings_as_of(Utc::now().date_naive(), cik, years, form_type)
            .await
    }

    /// Same as [`find_filings`](Self::find_filings) with an explicit current date.
    ///
    /// Indexes that cannot be fetched are logged and skipped.
    pub async fn find_filings_as_of(
        &self,
        today: NaiveDate,
        cik: &str,
        years: u32,
        form_type: &str,
    ) -> Vec<FilingRef> {
        let urls = master_index_urls(today, years);
        info!(
            "Searching {} master indexes for {} filings of CIK {}",
            urls.len(),
            form_type,
            cik
        );

        let mut entries = Vec::new();
        for url in &urls {
            match self.fetch_index(url).await {
                Ok(mut parsed) => entries.append(&mut parsed),
                Err(e) => warn!("Skipping master index {}: {}", url, e),
            }
        }

        let filings = select_filings(&entries, cik, form_type, years as usize);
        if filings.is_empty() {
            warn!("No {} filings found for CIK {}", form_type, cik);
        } else {
            info!("Found {} {} filings for CIK {}", filings.len(), form_type, cik);
        }
        filings
    }

    /// Fetch a filing and store it under `(sector, ticker, year, date)`.
    pub async fn download(
        &self,
        filing: &FilingRef,
        sector: &str,
        ticker: &str,
    ) -> DownloadResult<FilingLocator> {
        info!("Downloading {} filing from {}", ticker, filing.url);
        let document = self.fetcher.fetch(&filing.url).await?;

        let key = FilingKey::annual(sector, ticker, filing.date_filed);
        let locator = self.store.write(&key, &filing.url, &document.body)?;
        info!("Downloaded filing to {}", locator.path.display());
        Ok(locator)
    }

    /// Download each filing, skipping (and logging) individual failures.
    pub async fn download_all(
        &self,
        filings: &[FilingRef],
        sector: &str,
        ticker: &str,
    ) -> Vec<FilingLocator> {
        let mut stored = Vec::with_capacity(filings.len());
        for filing in filings {
            match self.download(filing, sector, ticker).await {
                Ok(locator) => stored.push(locator),
                Err(e) => error!(
                    "Failed to download {} filing {}: {}",
                    ticker, filing.accession_number, e
                ),
            }
        }
        info!(
            "Stored {}/{} filings for {}",
            stored.len(),
            filings.len(),
            ticker
        );
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{
        RawResponse, RequestHeaders, RetryPolicy, Transport, TransportError,
    };
    use crate::rate_limit::{RateLimitConfig, RateLimiter};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// Serves fixed bodies by URL; anything else is a 404.
    struct StaticSite(HashMap<String, String>);

    #[async_trait]
    impl Transport for StaticSite {
        async fn get(
            &self,
            url: &str,
            _headers: &[(String, String)],
        ) -> Result<RawResponse, TransportError> {
            Ok(match self.0.get(url) {
                Some(body) => RawResponse::new(200, body.as_bytes().to_vec()),
                None => RawResponse::new(404, "not found"),
            })
        }
    }

    fn index(rows: &[&str]) -> String {
        let mut text = "header\n".repeat(11);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    fn downloader(site: HashMap<String, String>, root: &std::path::Path) -> FilingDownloader {
        let fetcher = ResilientFetcher::with_transport(
            Arc::new(StaticSite(site)),
            RateLimiter::with_config(RateLimitConfig::per_second(10)),
            RequestHeaders::new("ops@example.com test/1", "www.sec.gov"),
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
                max_backoff: Duration::from_millis(10),
            },
        );
        FilingDownloader::new(fetcher, FilingStore::new(root))
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let filing_url = "https://www.sec.gov/Archives/edgar/data/320193/0000320193-23-000106.txt";
        let site = HashMap::from([
            (
                "https://www.sec.gov/Archives/edgar/full-index/2024/QTR1/master.idx".to_string(),
                index(&["320193|Apple Inc.|10-Q|2024-02-02|edgar/data/320193/0000320193-24-000006.txt"]),
            ),
            (
                "https://www.sec.gov/Archives/edgar/full-index/2023/QTR4/master.idx".to_string(),
                index(&[
                    "320193|Apple Inc.|10-K|2023-11-03|edgar/data/320193/0000320193-23-000106.txt",
                    "broken line",
                ]),
            ),
            (filing_url.to_string(), "APPLE 10-K BODY".to_string()),
        ]);
        let downloader = downloader(site, dir.path());

        // Other quarters 404 and are skipped.
        let today = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        let filings = downloader
            .find_filings_as_of(today, "320193", 2, "10-K")
            .await;
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].url, filing_url);

        let stored = downloader
            .download_all(&filings, "Information Technology", "AAPL")
            .await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0]
            .path
            .ends_with("Information Technology/AAPL/2023/AAPL_2023-11-03.txt"));
        assert_eq!(
            downloader.store().read_to_string(&stored[0]).unwrap(),
            "APPLE 10-K BODY"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_download_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(HashMap::new(), dir.path());
        let filing = FilingRef {
            cik: "0000320193".into(),
            company_name: "Apple Inc.".into(),
            form_type: "10-K".into(),
            date_filed: NaiveDate::from_ymd_opt(2023, 11, 3).unwrap(),
            url: "https://www.sec.gov/Archives/missing.txt".into(),
            accession_number: "missing".into(),
        };

        let err = downloader.download(&filing, "Tech", "AAPL").await.unwrap_err();
        assert!(matches!(err, DownloadError::Fetch(ref e) if e.status() == Some(404)));
        assert!(downloader.download_all(&[filing], "Tech", "AAPL").await.is_empty());
    }
}
