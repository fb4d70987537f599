//! Client configuration
//!
//! Every tunable of the SDK lives in [`LanternConfig`], resolved exactly once
//! at client construction. Defaults come from pure functions, environment
//! variables are read only inside [`LanternConfig::from_env`], and nothing in
//! the SDK consults the environment afterwards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Lantern client configuration.
///
/// The recognized option set:
/// - `flush_at`: queue length that triggers an immediate flush
/// - `flush_interval_ms`: timer-driven flush interval
/// - `queue_capacity`: maximum number of buffered events
/// - `max_batch_size`: maximum events per ingestion request
/// - `cache_ttl_secs`: prompt cache freshness window (0 disables caching)
/// - `upload_max_retries` / `upload_base_delay_ms`: media upload backoff
/// - `request_timeout_ms`: hard per-request transport timeout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanternConfig {
    /// Base URL of the Lantern instance
    #[serde(default = "default_host")]
    pub host: String,

    /// Public API key (basic auth username)
    pub public_key: String,

    /// Secret API key (basic auth password)
    pub secret_key: String,

    #[serde(default = "default_flush_at")]
    pub flush_at: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_upload_max_retries")]
    pub upload_max_retries: u32,

    #[serde(default = "default_upload_base_delay_ms")]
    pub upload_base_delay_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Release identifier attached to traces (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    /// Deployment environment attached to traces (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Whether inline media payloads are externalized before delivery
    #[serde(default = "default_media_enabled")]
    pub media_enabled: bool,
}

impl Default for LanternConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            public_key: String::new(),
            secret_key: String::new(),
            flush_at: default_flush_at(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_queue_capacity(),
            max_batch_size: default_max_batch_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            upload_max_retries: default_upload_max_retries(),
            upload_base_delay_ms: default_upload_base_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            release: None,
            environment: None,
            media_enabled: default_media_enabled(),
        }
    }
}

impl LanternConfig {
    /// Create a configuration with explicit credentials and default tunables.
    pub fn new(
        host: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    /// Resolve a configuration from `LANTERN_*` environment variables.
    ///
    /// `LANTERN_PUBLIC_KEY` and `LANTERN_SECRET_KEY` are required; everything
    /// else falls back to the documented defaults. This is the only place the
    /// SDK reads the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("LANTERN_HOST") {
            config.host = host;
        }
        config.public_key = env::var("LANTERN_PUBLIC_KEY")
            .map_err(|_| Error::config_error("LANTERN_PUBLIC_KEY is not set"))?;
        config.secret_key = env::var("LANTERN_SECRET_KEY")
            .map_err(|_| Error::config_error("LANTERN_SECRET_KEY is not set"))?;

        config.flush_at = parse_env("LANTERN_FLUSH_AT", config.flush_at)?;
        config.flush_interval_ms =
            parse_env("LANTERN_FLUSH_INTERVAL_MS", config.flush_interval_ms)?;
        config.queue_capacity = parse_env("LANTERN_QUEUE_CAPACITY", config.queue_capacity)?;
        config.max_batch_size = parse_env("LANTERN_MAX_BATCH_SIZE", config.max_batch_size)?;
        config.cache_ttl_secs = parse_env("LANTERN_CACHE_TTL_SECS", config.cache_ttl_secs)?;
        config.upload_max_retries =
            parse_env("LANTERN_UPLOAD_MAX_RETRIES", config.upload_max_retries)?;
        config.upload_base_delay_ms =
            parse_env("LANTERN_UPLOAD_BASE_DELAY_MS", config.upload_base_delay_ms)?;
        config.request_timeout_ms =
            parse_env("LANTERN_REQUEST_TIMEOUT_MS", config.request_timeout_ms)?;

        config.release = env::var("LANTERN_RELEASE").ok();
        config.environment = env::var("LANTERN_ENVIRONMENT").ok();
        if let Ok(enabled) = env::var("LANTERN_MEDIA_ENABLED") {
            config.media_enabled = enabled != "false" && enabled != "0";
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants between the tunables.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config_error("host must not be empty"));
        }
        if self.flush_at == 0 {
            return Err(Error::config_error("flushAt must be at least 1"));
        }
        if self.max_batch_size == 0 {
            return Err(Error::config_error("maxBatchSize must be at least 1"));
        }
        if self.queue_capacity < self.flush_at {
            return Err(Error::config_error(
                "queueCapacity must be at least flushAt",
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn upload_base_delay(&self) -> Duration {
        Duration::from_millis(self.upload_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Create test-friendly defaults (no credentials required)
    pub fn test_defaults() -> Self {
        Self {
            host: "http://localhost:3000".to_string(),
            public_key: "pk-test".to_string(),
            secret_key: "sk-test".to_string(),
            ..Self::default()
        }
    }
}

fn default_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_flush_at() -> usize {
    10
}

fn default_flush_interval_ms() -> u64 {
    1_000
}

fn default_queue_capacity() -> usize {
    100_000
}

fn default_max_batch_size() -> usize {
    100
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_upload_max_retries() -> u32 {
    3
}

fn default_upload_base_delay_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_media_enabled() -> bool {
    true
}

fn parse_env<T: std::str::FromStr>(name: &str, fallback: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(fallback),
    }
}
