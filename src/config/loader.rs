//! Configuration loading and merging logic.
//!
//! Precedence, lowest first: defaults, config file, environment, CLI options.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Config, ConfigError, ConfigResult, Settings};

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of the config file directory.
    pub use_cwd: bool,
    /// Data directory (--data flag).
    pub data: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir().join(path)
    }
}

/// Apply environment overrides read through `lookup`.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(email) = var("SEC_EMAIL") {
        settings.contact_email = Some(email);
    }
    if let Some(client_id) = var("EDGAR_CLIENT_ID") {
        settings.client_id = client_id;
    }
    if let Some(backend) = var("CACHE_BACKEND") {
        settings.cache_backend = Some(backend);
    }
    if let Some(dir) = var("FILINGACQUIRE_DATA_DIR") {
        settings.set_data_dir(absolute(&expand(&dir)));
    }
    if let Some(rps) = var("RATE_LIMIT_RPS") {
        let requests = rps
            .trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::Invalid {
                field: "RATE_LIMIT_RPS",
                reason: format!("{:?}: {}", rps, e),
            })?;
        settings.requests_per_window = requests;
        settings.window = Duration::from_secs(1);
    }
    Ok(())
}

async fn load_file_config(options: &LoadOptions) -> ConfigResult<Config> {
    match options.config_path {
        Some(ref path) => Config::load_from_path(path).await,
        None => Ok(Config::load().await),
    }
}

/// Load settings, reading environment overrides through `lookup`.
pub async fn load_settings_with_env<F>(options: LoadOptions, lookup: F) -> ConfigResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_file_config(&options).await?;
    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings, lookup)?;

    if let Some(ref data) = options.data {
        settings.set_data_dir(absolute(data));
    }

    settings.validate()?;
    Ok(settings)
}

/// Load settings with explicit options and the process environment.
pub async fn load_settings_with_options(options: LoadOptions) -> ConfigResult<Settings> {
    load_settings_with_env(options, |name| std::env::var(name).ok()).await
}
