//! Retry policy and response classification for archive fetches.

use std::time::Duration;

use rand::Rng;

use super::transport::{RawResponse, TransportError};
use crate::rate_limit::parse_retry_after;

/// Default number of attempts per logical fetch.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Ceiling applied to computed backoff delays.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Attempts, base delay, and ceiling for exponential backoff with jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// `min(max_backoff, base_delay * 2^attempt + jitter)`.
    pub fn backoff_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * 2f64.powi(exponent) + jitter;
        let capped = secs.min(self.max_backoff.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Backoff floor for `attempt`, ignoring jitter.
    pub fn backoff_floor(&self, attempt: u32) -> Duration {
        self.backoff_with_jitter(attempt, 0.0)
    }

    /// Backoff for `attempt` with jitter drawn uniformly from [0, 1) seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter: f64 = rand::rng().random();
        self.backoff_with_jitter(attempt, jitter)
    }

    /// Whether `attempt` (0-based) is the last one allowed.
    pub fn is_final_attempt(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_retries
    }
}

/// Why a single attempt did not produce a usable response.
#[derive(Debug)]
pub enum AttemptFailure {
    /// 429 or 403: the archive is throttling us.
    Throttled {
        status: u16,
        retry_after: Option<Duration>,
    },
    /// Any other non-200 status.
    HttpError { status: u16 },
    /// No response was received.
    Transport(TransportError),
}

/// Classify a response: only HTTP 200 counts as success.
pub fn classify(response: RawResponse) -> Result<RawResponse, AttemptFailure> {
    match response.status {
        200 => Ok(response),
        429 | 403 => Err(AttemptFailure::Throttled {
            status: response.status,
            retry_after: parse_retry_after(response.header("retry-after")),
        }),
        status => Err(AttemptFailure::HttpError { status }),
    }
}
