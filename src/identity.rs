//! Client identity rotation.
//!
//! Supplies plausible browser user-agent strings per request, either
//! uniformly at random or in round-robin order. The pool is fixed at
//! construction; an empty pool is a configuration error.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::config::ConfigError;

/// Desktop browser user agents (updated Nov 2024).
pub const DESKTOP_IDENTITIES: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Firefox on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Mobile browser user agents, opt-in via `include_mobile_identities`.
pub const MOBILE_IDENTITIES: &[&str] = &[
    // iPhone
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Mobile/15E148 Safari/604.1",
    // Android
    "Mozilla/5.0 (Linux; Android 14; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
];

/// Rotates through a fixed pool of client identities.
#[derive(Debug)]
pub struct IdentityRotator {
    pool: Vec<String>,
    cursor: AtomicUsize,
}

impl IdentityRotator {
    /// Build a rotator over the built-in desktop pool, optionally
    /// extended with the mobile pool.
    pub fn new(include_mobile: bool) -> Self {
        let mut pool: Vec<String> = DESKTOP_IDENTITIES.iter().map(|s| s.to_string()).collect();
        if include_mobile {
            pool.extend(MOBILE_IDENTITIES.iter().map(|s| s.to_string()));
        }
        Self {
            pool,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Build a rotator over a caller-supplied pool.
    pub fn with_pool(pool: Vec<String>) -> Result<Self, ConfigError> {
        if pool.is_empty() {
            return Err(ConfigError::EmptyIdentityPool);
        }
        Ok(Self {
            pool,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Pick an identity uniformly at random.
    pub fn random(&self) -> &str {
        let idx = rand::rng().random_range(0..self.pool.len());
        &self.pool[idx]
    }

    /// Pick the next identity in round-robin order.
    pub fn next(&self) -> &str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        &self.pool[idx]
    }

    /// Number of identities in the pool.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
