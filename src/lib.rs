//! filingacquire - rate-limited acquisition of EDGAR filings.
//!
//! The library is organised around four pieces:
//!
//! - [`rate_limit::RateLimiter`]: a process-wide sliding-window limiter.
//! - [`http_client::ResilientFetcher`]: GET with retries, backoff and
//!   Retry-After handling, gated by the limiter.
//! - [`storage::FilingStore`]: on-disk storage of fetched filings.
//! - [`cache::ResultCache`]: a two-tier cache for derived results.
//!
//! [`services::FilingDownloader`] ties fetching and storage together using
//! the master index helpers in [`edgar`].

pub mod cache;
pub mod config;
pub mod edgar;
pub mod http_client;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod storage;
