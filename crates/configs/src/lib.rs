//! # configs
//!
//! Layered settings: built-in defaults, then an optional TOML file, then
//! `DIARY__SECTION__KEY` environment variables (a `.env` file is loaded
//! first when present).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "diary.toml";
const ENV_PREFIX: &str = "DIARY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub backend: BackendSettings,
    pub feed: FeedSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub log: LogSettings,
}

/// Hosted table store. Both fields unset means "no backend".
#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    pub url: Option<String>,
    pub anon_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    pub page_size: usize,
    /// Including the first attempt
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff: BackoffKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// JSON slot used while signed out
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    pub email: Option<String>,
}

/// Identity handed over by whatever performed sign-in.
#[derive(Debug, Default, Deserialize)]
pub struct SessionSettings {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub access_token: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Loads settings from `path` (or `diary.toml`) plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), ".env loaded");
        }
        let file = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let settings = Self::builder()?
            .add_source(File::from(file.as_path()).required(path.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        info!(file = %file.display(), remote = settings.backend.is_configured(), "settings loaded");
        Ok(settings)
    }

    /// Defaults only, no file and no environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        let settings = Self::builder()?.build()?.try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("backend.timeout_secs", 10)?
            .set_default("feed.page_size", 10)?
            .set_default("feed.max_attempts", 3)?
            .set_default("feed.base_delay_ms", 1000)?
            .set_default("feed.max_delay_ms", 8000)?
            .set_default("feed.backoff", "exponential")?
            .set_default("storage.local_path", "diary_entries.json")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size must be at least 1".into()));
        }
        if self.feed.max_attempts == 0 {
            return Err(ConfigError::Invalid("feed.max_attempts must be at least 1".into()));
        }
        if let Some(url) = &self.backend.url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!("backend.url '{url}' is not an http(s) URL")));
            }
            if self.backend.anon_key.is_none() {
                return Err(ConfigError::Invalid("backend.url is set but backend.anon_key is missing".into()));
            }
        }
        Ok(())
    }
}

impl BackendSettings {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::defaults().unwrap();
        assert_eq!(settings.feed.page_size, 10);
        assert_eq!(settings.feed.max_attempts, 3);
        assert_eq!(settings.feed.backoff, BackoffKind::Exponential);
        assert_eq!(settings.storage.local_path, PathBuf::from("diary_entries.json"));
        assert!(!settings.backend.is_configured());
        assert!(settings.session.user_id.is_none());
    }

    #[test]
    fn test_url_without_key_is_rejected() {
        let mut settings = Settings::defaults().unwrap();
        settings.backend.url = Some("https://demo.example.co".into());
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        let mut settings = Settings::defaults().unwrap();
        settings.backend.url = Some("ftp://demo".into());
        settings.backend.anon_key = Some(SecretString::from("k".to_string()));
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let mut settings = Settings::defaults().unwrap();
        settings.feed.page_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_anon_key_is_redacted_in_debug_output() {
        let json = serde_json::json!({ "url": "https://x.example", "anon_key": "super-secret", "timeout_secs": 5 });
        let backend: BackendSettings = serde_json::from_value(json).unwrap();
        assert!(!format!("{backend:?}").contains("super-secret"));
    }
}
