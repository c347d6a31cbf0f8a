//! Rate limiting for outbound archive requests.
//!
//! A single sliding-window limiter caps how many requests the whole process
//! issues per window, regardless of how many tasks are fetching.

mod config;
mod limiter;

pub use config::{
    LimiterStats, RateLimitConfig, DEFAULT_REQUESTS_PER_WINDOW, DEFAULT_WINDOW,
    MAX_REQUESTS_PER_WINDOW,
};
pub use limiter::RateLimiter;

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Parse a Retry-After header value.
///
/// Accepts delay-seconds (`"7"`) or an HTTP-date. Returns None if the header
/// is missing or unparseable; a date in the past yields a zero delay.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    parse_retry_after_at(header_value, Utc::now())
}

pub(crate) fn parse_retry_after_at(header_value: Option<&str>, now: DateTime<Utc>) -> Option<Duration> {
    let value = header_value?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((when - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after(Some("7")), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(Some(" 120 ")), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_retry_after_missing_or_invalid() {
        assert_eq!(parse_retry_after(None), None);
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(Some("-3")), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 30).unwrap();
        assert_eq!(
            parse_retry_after_at(Some("Wed, 21 Oct 2015 07:28:00 GMT"), now),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after_at(Some("Wed, 21 Oct 2015 07:28:00 GMT"), now),
            Some(Duration::ZERO)
        );
    }
}
