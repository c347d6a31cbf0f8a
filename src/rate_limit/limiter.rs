//! Process-wide sliding-window rate limiter.
//!
//! Every outbound request to the archive goes through a single `RateLimiter`.
//! Cloning the limiter hands out another handle to the same grant queue.
//!
//! Waiters are not served in arrival order: whichever task re-checks first
//! after a slot frees up gets it. Only the aggregate ceiling is guaranteed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

use super::config::{LimiterStats, RateLimitConfig};

#[derive(Debug, Default)]
struct Counters {
    granted: AtomicU64,
    waited: AtomicU64,
}

/// Sliding-window limiter shared by every fetch call site.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    grants: Arc<Mutex<VecDeque<Instant>>>,
    counters: Arc<Counters>,
}

impl RateLimiter {
    /// Create a limiter with the default 10 requests per second.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a limiter with custom config.
    pub fn with_config(config: RateLimitConfig) -> Self {
        let config = config.normalized();
        Self {
            grants: Arc::new(Mutex::new(VecDeque::new())),
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a request may be issued without exceeding the window ceiling,
    /// then record the grant.
    ///
    /// The queue lock is only held while pruning and recording; it is released
    /// before sleeping so other callers keep making progress.
    pub async fn acquire(&self) {
        let mut has_waited = false;

        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                prune_expired(&mut grants, now, self.config.window);

                if grants.len() < self.config.requests_per_window {
                    grants.push_back(now);
                    None
                } else {
                    // Queue is full, so it is non-empty: the oldest grant frees the next slot.
                    let oldest = grants.front().copied().unwrap_or(now);
                    Some(
                        self.config
                            .window
                            .saturating_sub(now.duration_since(oldest)),
                    )
                }
            };

            match wait {
                None => {
                    self.counters.granted.fetch_add(1, Ordering::Relaxed);
                    if has_waited {
                        self.counters.waited.fetch_add(1, Ordering::Relaxed);
                    }
                    return;
                }
                Some(wait) => {
                    has_waited = true;
                    debug!("Rate limit reached, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Current counters, with expired grants pruned first.
    pub async fn stats(&self) -> LimiterStats {
        let in_window = {
            let mut grants = self.grants.lock().await;
            prune_expired(&mut grants, Instant::now(), self.config.window);
            grants.len()
        };

        LimiterStats {
            requests_per_window: self.config.requests_per_window,
            window: self.config.window,
            in_window,
            total_granted: self.counters.granted.load(Ordering::Relaxed),
            total_waited: self.counters.waited.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop grants whose age has reached the window length.
fn prune_expired(grants: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = grants.front() {
        if now.duration_since(oldest) >= window {
            grants.pop_front();
        } else {
            break;
        }
    }
}
