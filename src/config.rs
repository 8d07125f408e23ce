//! Fetcher configuration.
//!
//! Every recognized option is an explicit field with a default, validated
//! once at construction. Misconfiguration fails fast; it indicates a
//! programming error rather than a runtime condition.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at fetcher construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("identity pool must not be empty")]
    EmptyIdentityPool,

    #[error("invalid delay range: min {min}s > max {max}s")]
    InvalidDelayRange { min: f64, max: f64 },

    #[error("delays must be non-negative, got {0}s")]
    NegativeDelay(f64),

    #[error("timeout must be non-zero")]
    ZeroTimeout,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for a [`Fetcher`](crate::Fetcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Minimum inter-request delay in seconds.
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: f64,
    /// Maximum inter-request delay in seconds (before backoff widening).
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
    /// Retries after the initial attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-attempt network timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether to consult robots.txt before fetching.
    #[serde(default = "default_true")]
    pub respect_policy: bool,
    /// Proxy endpoint URLs. Empty means direct connection only.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Extend the identity pool with mobile browser identities.
    #[serde(default)]
    pub include_mobile_identities: bool,
}

fn default_min_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    3.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout(),
            respect_policy: default_true(),
            proxies: Vec::new(),
            include_mobile_identities: false,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_secs < 0.0 {
            return Err(ConfigError::NegativeDelay(self.min_delay_secs));
        }
        if self.max_delay_secs < 0.0 {
            return Err(ConfigError::NegativeDelay(self.max_delay_secs));
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay_secs,
                max: self.max_delay_secs,
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_secs_f64(self.min_delay_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs_f64(self.max_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
