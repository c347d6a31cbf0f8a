//! Resolved application settings.

use std::path::PathBuf;
use std::time::Duration;

use super::{ConfigError, ConfigResult, DEFAULT_CACHE_FILENAME, FILINGS_SUBDIR};
use crate::cache::{CacheSettings, CacheTarget, DEFAULT_TTL};
use crate::edgar::ARCHIVE_HOST;
use crate::http_client::{
    archive_user_agent, RequestHeaders, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_CLIENT_ID,
    DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES,
};
use crate::rate_limit::{
    RateLimitConfig, DEFAULT_REQUESTS_PER_WINDOW, DEFAULT_WINDOW, MAX_REQUESTS_PER_WINDOW,
};

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Root of the filing store.
    pub filings_dir: PathBuf,
    /// Contact email for the User-Agent. Required before any fetch.
    pub contact_email: Option<String>,
    pub client_id: String,
    pub requests_per_window: usize,
    pub window: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
    /// Result cache backend selector (None = SQLite in the data directory).
    pub cache_backend: Option<String>,
    pub cache_ttl: Duration,
    pub fallback_cache_max_age: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/.local/share/filingacquire (or platform equivalent), then home, then CWD
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("filingacquire");

        Self {
            filings_dir: data_dir.join(FILINGS_SUBDIR),
            data_dir,
            contact_email: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: Duration::from_secs(30),
            cache_backend: None,
            cache_ttl: DEFAULT_TTL,
            fallback_cache_max_age: None,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let mut settings = Self::default();
        settings.set_data_dir(data_dir);
        settings
    }

    /// Move the data directory; the filing store follows it.
    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.filings_dir = data_dir.join(FILINGS_SUBDIR);
        self.data_dir = data_dir;
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_CACHE_FILENAME)
    }

    /// Check numeric bounds. The contact email is checked separately by
    /// [`request_headers`](Self::request_headers), since only fetching needs it.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.requests_per_window == 0 {
            return Err(ConfigError::Invalid {
                field: "requests_per_window",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.requests_per_window > MAX_REQUESTS_PER_WINDOW {
            return Err(ConfigError::Invalid {
                field: "requests_per_window",
                reason: format!("must be at most {}", MAX_REQUESTS_PER_WINDOW),
            });
        }
        if self.window.is_zero() {
            return Err(ConfigError::Invalid {
                field: "window",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        self.cache_settings().map(|_| ())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_window: self.requests_per_window,
            window: self.window,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            max_backoff: self.max_backoff,
        }
    }

    /// The validated contact email.
    pub fn contact_email(&self) -> ConfigResult<&str> {
        let email = self
            .contact_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingContactEmail)?;

        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
            && !email.contains(char::is_whitespace);
        if !valid {
            return Err(ConfigError::InvalidContactEmail(email.to_string()));
        }
        Ok(email)
    }

    /// Headers for archive requests; fails without a usable contact email.
    pub fn request_headers(&self) -> ConfigResult<RequestHeaders> {
        let email = self.contact_email()?;
        Ok(RequestHeaders::new(
            archive_user_agent(email, &self.client_id),
            ARCHIVE_HOST,
        ))
    }

    pub fn cache_settings(&self) -> ConfigResult<CacheSettings> {
        let default_path = self.cache_db_path();
        let target = match self.cache_backend.as_deref() {
            None => CacheTarget::Sqlite(default_path),
            Some(value) => {
                CacheTarget::parse(value, &default_path).ok_or_else(|| ConfigError::Invalid {
                    field: "cache_backend",
                    reason: format!("unrecognized backend {:?}", value),
                })?
            }
        };

        Ok(CacheSettings {
            ttl: self.cache_ttl,
            fallback_max_age: self.fallback_cache_max_age,
            ..CacheSettings::new(target)
        })
    }
}
