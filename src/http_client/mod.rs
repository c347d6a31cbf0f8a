//! Resilient, rate-limited HTTP fetching for archive documents.
//!
//! Each logical fetch runs as a small state machine:
//! `Attempting -> (Success | Backoff -> Attempting) | Exhausted`.
//! Every attempt first takes a grant from the shared [`RateLimiter`].

mod headers;
mod response;
mod retry;
mod transport;

pub use headers::{archive_user_agent, RequestHeaders, DEFAULT_CLIENT_ID};
pub use response::FetchedDocument;
pub use retry::{
    classify, AttemptFailure, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_BACKOFF,
    DEFAULT_MAX_RETRIES,
};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::rate_limit::RateLimiter;
use response::body_preview;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// What the final failed attempt observed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LastFailure {
    #[error("HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors surfaced by [`ResilientFetcher`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] TransportError),
    #[error("fetch of {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: LastFailure,
    },
}

impl FetchError {
    /// HTTP status of the last attempt, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Exhausted {
                last: LastFailure::Status(status),
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// Next step of a fetch after an attempt did not succeed.
#[derive(Debug)]
enum FetchState {
    Attempting,
    Backoff(Duration),
    Exhausted(LastFailure),
}

/// Fetches archive URLs through the shared rate limiter, retrying with backoff.
#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    rate_limiter: RateLimiter,
    headers: RequestHeaders,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    /// Create a fetcher backed by reqwest.
    pub fn new(
        rate_limiter: RateLimiter,
        headers: RequestHeaders,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> FetchResult<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            rate_limiter,
            headers,
            policy,
        ))
    }

    /// Create a fetcher over an arbitrary transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        rate_limiter: RateLimiter,
        headers: RequestHeaders,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            headers,
            policy,
        }
    }

    /// Get the rate limiter shared by this fetcher.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`, returning the body of the first HTTP 200 response.
    pub async fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        let max = self.policy.max_retries.max(1);
        let headers = self.headers.for_url(url);
        let mut attempt: u32 = 0;
        let mut state = FetchState::Attempting;

        loop {
            state = match state {
                FetchState::Attempting => {
                    self.rate_limiter.acquire().await;
                    info!("Requesting {} (attempt {}/{})", url, attempt + 1, max);

                    let outcome = match self.transport.get(url, &headers).await {
                        Ok(response) => {
                            info!("Response status for {}: {}", url, response.status);
                            if response.status != 200 {
                                debug!(
                                    "Response content from {}: {}",
                                    url,
                                    body_preview(&response.body, 1000)
                                );
                            }
                            classify(response)
                        }
                        Err(e) => Err(AttemptFailure::Transport(e)),
                    };

                    match outcome {
                        Ok(response) => {
                            debug!("Fetched {} ({} bytes)", url, response.body.len());
                            return Ok(FetchedDocument {
                                url: url.to_string(),
                                status: response.status,
                                headers: response.headers,
                                body: response.body,
                                attempts: attempt + 1,
                            });
                        }
                        Err(failure) => self.next_state(url, attempt, failure),
                    }
                }
                FetchState::Backoff(wait) => {
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    FetchState::Attempting
                }
                FetchState::Exhausted(last) => {
                    error!("Giving up on {} after {} attempts: {}", url, attempt + 1, last);
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        last,
                    });
                }
            };
        }
    }

    /// Fetch `url` and decode the body as UTF-8 (lossy).
    pub async fn fetch_text(&self, url: &str) -> FetchResult<String> {
        Ok(self.fetch(url).await?.text())
    }

    /// Decide whether a failed attempt backs off or ends the fetch.
    fn next_state(&self, url: &str, attempt: u32, failure: AttemptFailure) -> FetchState {
        let is_final = self.policy.is_final_attempt(attempt);

        match failure {
            AttemptFailure::Throttled {
                status,
                retry_after,
            } => {
                if is_final {
                    return FetchState::Exhausted(LastFailure::Status(status));
                }
                let wait = retry_after.unwrap_or_else(|| self.policy.backoff(attempt));
                warn!(
                    "Rate limited by archive (HTTP {}) for {}, waiting {:.2}s",
                    status,
                    url,
                    wait.as_secs_f64()
                );
                FetchState::Backoff(wait)
            }
            AttemptFailure::HttpError { status } => {
                error!("Request to {} failed with status {}", url, status);
                if is_final {
                    return FetchState::Exhausted(LastFailure::Status(status));
                }
                let wait = self.policy.backoff(attempt);
                warn!("Retrying {} in {:.2}s", url, wait.as_secs_f64());
                FetchState::Backoff(wait)
            }
            AttemptFailure::Transport(e) => {
                error!("Request error for {}: {}", url, e);
                if is_final {
                    return FetchState::Exhausted(LastFailure::Transport(e));
                }
                let wait = self.policy.backoff(attempt);
                warn!("Retrying {} in {:.2}s", url, wait.as_secs_f64());
                FetchState::Backoff(wait)
            }
        }
    }
}
