//! Configuration types for vsco-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Listing behavior (how many stripes, how large each page is)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Number of concurrent pagination workers, which is also the page stride (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Items requested per listing page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Size requested for the single bulk journal listing call (default: 10000)
    #[serde(default = "default_journal_page_size")]
    pub journal_page_size: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            page_size: default_page_size(),
            journal_page_size: default_journal_page_size(),
        }
    }
}

/// Download behavior configuration (destination, concurrency, request limits)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory; each account is mirrored to `download_dir/{username}` (default: ".")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent item downloads (default: 5)
    #[serde(default = "default_workers")]
    pub max_concurrent_downloads: usize,

    /// Per-request timeout for listing calls and media streams (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_workers(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Remote API location and request identity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the JSON API, without a trailing slash (default: "http://vsco.co/api/2.0")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Where cross-run state lives and which of it is used
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding `{account}_cache_store` and `{account}_latest_cache_store` (default: ".")
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Keep a dedup ledger across runs (`-l/--latest`)
    #[serde(default)]
    pub ledger: bool,

    /// Remember site/collection ids per account (`--cache-hit`)
    #[serde(default)]
    pub site_cache: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            ledger: false,
            site_cache: false,
        }
    }
}

/// Main configuration for [`VscoDownloader`](crate::VscoDownloader)
///
/// Every field has a default, so `Config::default()` matches the reference
/// behavior: 5 listing workers, 5 download workers, page size 100.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing/pagination settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Download destination and concurrency
    #[serde(default)]
    pub download: DownloadConfig,

    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry policy for page fetches and item downloads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cross-run state
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load a JSON config file. Missing keys fall back to their defaults.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.harvest.workers == 0 {
            return Err(Error::config("harvest.workers", "must be at least 1"));
        }
        if self.harvest.page_size == 0 {
            return Err(Error::config("harvest.page_size", "must be at least 1"));
        }
        if self.harvest.journal_page_size == 0 {
            return Err(Error::config(
                "harvest.journal_page_size",
                "must be at least 1",
            ));
        }
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "download.max_concurrent_downloads",
                "must be at least 1",
            ));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config("api.base_url", e.to_string()))?;
        self.retry.validate()
    }
}

impl RetryConfig {
    /// Reject backoff settings that would make delays shrink, overflow or go negative
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!("must be a finite number >= 1.0, got {}", self.backoff_multiplier),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(Error::config(
                "retry.initial_delay",
                "must not be greater than retry.max_delay",
            ));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    5
}

fn default_page_size() -> usize {
    100
}

fn default_journal_page_size() -> usize {
    10_000
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_base_url() -> String {
    "http://vsco.co/api/2.0".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
