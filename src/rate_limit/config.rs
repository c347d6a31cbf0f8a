//! Rate limiter configuration and types.

use std::time::Duration;

/// Default number of requests granted per window (EDGAR fair-access ceiling).
pub const DEFAULT_REQUESTS_PER_WINDOW: usize = 10;

/// Largest window capacity accepted from configuration.
pub const MAX_REQUESTS_PER_WINDOW: usize = 10_000;

/// Default length of the sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Configuration for the sliding-window limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum grants allowed within any trailing `window`.
    pub requests_per_window: usize,
    /// Length of the sliding window.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Config allowing `requests` grants per second.
    pub fn per_second(requests: usize) -> Self {
        Self {
            requests_per_window: requests,
            window: DEFAULT_WINDOW,
        }
    }

    /// Clamp values the limiter cannot work with (zero capacity or zero window).
    pub(crate) fn normalized(self) -> Self {
        Self {
            requests_per_window: self.requests_per_window.max(1),
            window: if self.window.is_zero() {
                Duration::from_millis(1)
            } else {
                self.window
            },
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Snapshot of limiter counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStats {
    pub requests_per_window: usize,
    pub window: Duration,
    /// Grants whose age is still inside the window.
    pub in_window: usize,
    /// Grants issued since construction.
    pub total_granted: u64,
    /// Calls that had to wait at least once before being granted.
    pub total_waited: u64,
}
