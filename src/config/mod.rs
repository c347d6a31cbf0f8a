//! Configuration management for filingacquire using the prefer crate.

mod loader;
mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use loader::{apply_env_overrides, load_settings_with_env, load_settings_with_options, LoadOptions};
pub use settings::Settings;

/// Name used for config file discovery.
pub const CONFIG_NAME: &str = "filingacquire";

/// Default SQLite cache filename inside the data directory.
pub const DEFAULT_CACHE_FILENAME: &str = "cache.db";

/// Default filings subdirectory name.
pub const FILINGS_SUBDIR: &str = "filings";

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SEC_EMAIL is not set; the archive requires a contact email in the User-Agent")]
    MissingContactEmail,
    #[error("contact email {0:?} is not a valid email address")]
    InvalidContactEmail(String),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to load config file {path}: {reason}")]
    File { path: PathBuf, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Where fetched filings are stored (defaults to `<data_dir>/filings`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filings_dir: Option<String>,
    /// Contact email sent in the User-Agent.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "contact_email")]
    pub sec_email: Option<String>,
    /// Client identifier appended to the contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_window: Option<u64>,
    /// Rate limit window in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_ms: Option<u64>,
    /// Attempts per fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Result cache backend (`sqlite`, `sqlite:<path>`, `redis://...`, `memory`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_hours: Option<u64>,
    /// Age bound for the in-memory fallback tier (unbounded when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_cache_max_age_hours: Option<u64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover and load a config file, falling back to defaults.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load config from a specific file, picking the format by extension.
    pub async fn load_from_path(path: &Path) -> ConfigResult<Self> {
        let file_error = |reason: String| ConfigError::File {
            path: path.to_path_buf(),
            reason,
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| file_error(e.to_string()))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext).map_err(file_error)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| format!("invalid TOML: {}", e)),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| format!("invalid YAML: {}", e))
            }
            _ => serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {}", e)),
        }
    }

    /// Directory relative paths in this config are resolved against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a possibly relative, possibly `~`-prefixed path.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply file values on top of `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.set_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(ref filings_dir) = self.filings_dir {
            settings.filings_dir = self.resolve_path(filings_dir, base_dir);
        }
        if let Some(ref email) = self.sec_email {
            settings.contact_email = Some(email.clone());
        }
        if let Some(ref client_id) = self.client_id {
            settings.client_id = client_id.clone();
        }
        if let Some(n) = self.requests_per_window {
            settings.requests_per_window = usize::try_from(n).unwrap_or(usize::MAX);
        }
        if let Some(ms) = self.window_ms {
            settings.window = std::time::Duration::from_millis(ms);
        }
        if let Some(n) = self.max_retries {
            settings.max_retries = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(ms) = self.base_delay_ms {
            settings.base_delay = std::time::Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_backoff_ms {
            settings.max_backoff = std::time::Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout {
            settings.request_timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(ref backend) = self.cache_backend {
            settings.cache_backend = Some(backend.clone());
        }
        if let Some(hours) = self.cache_ttl_hours {
            settings.cache_ttl = hours_to_duration(hours);
        }
        if let Some(hours) = self.fallback_cache_max_age_hours {
            settings.fallback_cache_max_age = Some(hours_to_duration(hours));
        }
    }
}

fn hours_to_duration(hours: u64) -> std::time::Duration {
    std::time::Duration::from_secs(hours.saturating_mul(60 * 60))
}
