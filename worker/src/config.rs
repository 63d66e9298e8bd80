//! Configuration management for the worker.

use crate::queue_store::DEFAULT_STORAGE_KEY;
use outbox_engine::RetryPolicy;
use std::env;
use std::time::Duration;

/// Replay settings for an [`crate::Outbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Retry budget and backoff
    pub retry: RetryPolicy,
    /// Upper bound on a single handler call, `None` to trust the handler
    pub handler_timeout: Option<Duration>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            handler_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Where the queue is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// A directory holding one file per key
    Directory(String),
    /// A `sqlite:` database URL
    Sqlite(String),
}

impl StorageLocation {
    fn parse(raw: &str) -> Self {
        if raw.starts_with("sqlite:") {
            StorageLocation::Sqlite(raw.to_string())
        } else {
            StorageLocation::Directory(raw.to_string())
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote store base URL
    pub remote_url: Option<String>,
    /// Storage backend location
    pub storage: StorageLocation,
    /// Key the queue is stored under
    pub storage_key: String,
    /// Replay settings
    pub replay: ReplayConfig,
    /// Interval between periodic drains
    pub drain_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber(name)),
                None => Ok(default),
            }
        };

        let remote_url = lookup("OUTBOX_REMOTE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let storage = StorageLocation::parse(
            &lookup("OUTBOX_STORAGE").unwrap_or_else(|| "./outbox-data".to_string()),
        );

        let storage_key =
            lookup("OUTBOX_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());

        let max_retries = u32::try_from(number("OUTBOX_MAX_RETRIES", 5)?)
            .map_err(|_| ConfigError::InvalidNumber("OUTBOX_MAX_RETRIES"))?;
        let base_delay = Duration::from_millis(number("OUTBOX_BASE_DELAY_MS", 1000)?);
        let handler_timeout = match number("OUTBOX_HANDLER_TIMEOUT_MS", 10_000)? {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };
        let drain_interval = Duration::from_secs(number("OUTBOX_DRAIN_INTERVAL_SECS", 30)?.max(1));

        Ok(Self {
            remote_url,
            storage,
            storage_key,
            replay: ReplayConfig {
                retry: RetryPolicy::new(max_retries, base_delay),
                handler_timeout,
            },
            drain_interval,
        })
    }

    /// The remote URL, required by commands that talk to the remote store.
    pub fn require_remote_url(&self) -> Result<&str, ConfigError> {
        self.remote_url
            .as_deref()
            .ok_or(ConfigError::MissingRemoteUrl)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OUTBOX_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.remote_url, None);
        assert_eq!(
            config.storage,
            StorageLocation::Directory("./outbox-data".into())
        );
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.replay.retry.max_retries, 5);
        assert_eq!(config.replay.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.replay.handler_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.drain_interval, Duration::from_secs(30));
        assert_eq!(
            config.require_remote_url(),
            Err(ConfigError::MissingRemoteUrl)
        );
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OUTBOX_REMOTE_URL", " https://sync.example.com "),
            ("OUTBOX_STORAGE", "sqlite://outbox.db"),
            ("OUTBOX_MAX_RETRIES", "3"),
            ("OUTBOX_BASE_DELAY_MS", "250"),
            ("OUTBOX_HANDLER_TIMEOUT_MS", "0"),
            ("OUTBOX_DRAIN_INTERVAL_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.require_remote_url(), Ok("https://sync.example.com"));
        assert_eq!(
            config.storage,
            StorageLocation::Sqlite("sqlite://outbox.db".into())
        );
        assert_eq!(
            config.replay.retry,
            RetryPolicy::new(3, Duration::from_millis(250))
        );
        assert_eq!(config.replay.handler_timeout, None);
        assert_eq!(config.drain_interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_number() {
        let err = Config::from_lookup(lookup(&[("OUTBOX_MAX_RETRIES", "many")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidNumber("OUTBOX_MAX_RETRIES"));
    }
}
