//! Client configuration.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. `epctl --config <path>`)
//! 2. `~/.europarl/config.toml` (user)
//! 3. `/etc/europarl/config.toml` (system)
//!
//! If none exists the defaults are used. Environment variables
//! (`EP_API_BASE_URL`, `EP_REQUEST_TIMEOUT_MS`, ...) override file values via
//! [`ClientConfig::apply_env`].
//!
//! ```toml
//! base_url = "https://data.europarl.europa.eu/api/v2/"
//! request_timeout_ms = 10000
//! max_retries = 3
//! cache_ttl_ms = 900000
//! rate_limit_tokens = 100
//! rate_limit_interval = "minute"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::pipeline::{DEFAULT_MAX_RESPONSE_BYTES, RateLimitInterval, RetryConfig};
use crate::telemetry::DEFAULT_MAX_SAMPLES;
use crate::{EuroparlError, Result};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://data.europarl.europa.eu/api/v2/";

/// Everything needed to construct an [`EuroparlClient`](crate::EuroparlClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root (default: the EP open-data v2 API).
    pub base_url: String,
    /// Per-attempt deadline in milliseconds (default: 10000).
    pub request_timeout_ms: u64,
    /// Whether transient failures are retried (default: true).
    pub retry_enabled: bool,
    /// Additional attempts after the first (default: 3).
    pub max_retries: u32,
    /// Base backoff in milliseconds, doubled per retry (default: 1000).
    pub retry_delay_ms: u64,
    /// Cache entry lifetime in milliseconds (default: 15 minutes).
    pub cache_ttl_ms: u64,
    /// Cache capacity (default: 500).
    pub max_cache_entries: usize,
    /// Rate-limit bucket capacity (default: 100).
    pub rate_limit_tokens: u32,
    /// Refill window for a full bucket (default: minute).
    pub rate_limit_interval: RateLimitInterval,
    /// Response body budget in bytes (default: 10 MiB).
    pub max_response_bytes: u64,
    /// Latency samples kept per histogram series (default: 1000).
    pub histogram_max_samples: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            retry_enabled: true,
            max_retries: 3,
            retry_delay_ms: 1_000,
            cache_ttl_ms: 15 * 60 * 1000,
            max_cache_entries: 500,
            rate_limit_tokens: 100,
            rate_limit_interval: RateLimitInterval::Minute,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            histogram_max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the standard locations, then apply
    /// environment overrides and validate.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML file. No environment overrides are applied.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EuroparlError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            EuroparlError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path. `Ok(None)` means "use defaults".
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(EuroparlError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".europarl").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/europarl/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Override fields from `EP_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable source.
    pub(crate) fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("EP_API_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = var("EP_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_var("EP_REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("EP_RETRY_ENABLED") {
            self.retry_enabled = parse_bool("EP_RETRY_ENABLED", &v)?;
        }
        if let Some(v) = var("EP_MAX_RETRIES") {
            self.max_retries = parse_var("EP_MAX_RETRIES", &v)?;
        }
        if let Some(v) = var("EP_CACHE_TTL_MS") {
            self.cache_ttl_ms = parse_var("EP_CACHE_TTL_MS", &v)?;
        }
        if let Some(v) = var("EP_MAX_CACHE_ENTRIES") {
            self.max_cache_entries = parse_var("EP_MAX_CACHE_ENTRIES", &v)?;
        }
        if let Some(v) = var("EP_RATE_LIMIT_TOKENS") {
            self.rate_limit_tokens = parse_var("EP_RATE_LIMIT_TOKENS", &v)?;
        }
        if let Some(v) = var("EP_RATE_LIMIT_INTERVAL") {
            self.rate_limit_interval = v.parse()?;
        }
        if let Some(v) = var("EP_MAX_RESPONSE_BYTES") {
            self.max_response_bytes = parse_var("EP_MAX_RESPONSE_BYTES", &v)?;
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("retry_delay_ms", self.retry_delay_ms),
            ("cache_ttl_ms", self.cache_ttl_ms),
            ("max_cache_entries", self.max_cache_entries as u64),
            ("rate_limit_tokens", u64::from(self.rate_limit_tokens)),
            ("max_response_bytes", self.max_response_bytes),
            ("histogram_max_samples", self.histogram_max_samples as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EuroparlError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(EuroparlError::Configuration(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Retry settings; `retry_enabled = false` means a single attempt.
    pub fn retry_config(&self) -> RetryConfig {
        let max_retries = if self.retry_enabled { self.max_retries } else { 0 };
        RetryConfig::new()
            .max_retries(max_retries)
            .timeout(self.request_timeout())
            .retry_delay(Duration::from_millis(self.retry_delay_ms))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_cache_entries)
            .ttl(self.cache_ttl())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        EuroparlError::Configuration(format!("invalid value for {name} ('{value}'): {e}"))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EuroparlError::Configuration(format!(
            "invalid value for {name} ('{value}'): expected true or false"
        ))),
    }
}
