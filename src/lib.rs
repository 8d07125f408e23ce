//! robustfetch - adaptive, policy-aware HTTP fetch engine.
//!
//! Retrieves remote resources while behaving as a well-mannered, resilient
//! client: rotates client identity, randomizes request fingerprints,
//! throttles with jittered exponential backoff, honors robots.txt, retries
//! transient failures, and tracks outcome statistics.

// The identity rotator exposes a `next` method per its rotation contract,
// not an Iterator implementation.
#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod fetcher;
pub mod fingerprint;
pub mod identity;
pub mod proxy;
pub mod rate_limit;
pub mod robots;
pub mod transport;

pub use config::{ConfigError, FetcherConfig};
pub use fetcher::{FetchOptions, FetchOutcome, FetchResult, Fetcher, StatsSnapshot};
