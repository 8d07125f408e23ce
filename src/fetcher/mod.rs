//! Fetch orchestration.
//!
//! For each requested URL: consult robots.txt, wait out the rate limiter,
//! assemble a fingerprinted header set, pick a proxy, dispatch with a
//! bounded timeout, classify the outcome, and update subordinate state.
//! Transient failures retry with backoff up to the configured budget.

mod result;
mod stats;

pub use result::{FetchOutcome, FetchResult};
pub use stats::StatsSnapshot;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, FetcherConfig};
use crate::fingerprint::FingerprintGenerator;
use crate::identity::IdentityRotator;
use crate::proxy::ProxyPool;
use crate::rate_limit::RateLimiter;
use crate::robots::RobotsChecker;
use crate::transport::{HttpTransport, Transport, TransportRequest};
use stats::FetchStats;

/// What to do with an observed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// 200: done, record success.
    Success,
    /// 429 or 500/502/503/504: back off and retry.
    Retry,
    /// 403: the server is actively refusing us; retrying invites a
    /// harsher block. Recorded distinctly, never retried.
    Blocked,
    /// Anything else: terminal on first sight.
    Terminal,
}

fn classify(status: u16) -> Disposition {
    match status {
        200 => Disposition::Success,
        429 | 500 | 502 | 503 | 504 => Disposition::Retry,
        403 => Disposition::Blocked,
        _ => Disposition::Terminal,
    }
}

/// Per-call overrides for [`Fetcher::fetch_with`].
#[derive(Debug, Default, Clone)]
pub struct FetchOptions {
    /// Extra headers merged on top of the generated fingerprint
    /// (overrides win).
    pub headers: HashMap<String, String>,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
    /// Cancellation signal, checked before each attempt and raced
    /// against sleeps and dispatch.
    pub cancel: Option<CancellationToken>,
}

enum Raced<T> {
    Done(T),
    Cancelled,
}

async fn race<T>(cancel: Option<&CancellationToken>, fut: impl Future<Output = T>) -> Raced<T> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Raced::Cancelled,
                value = fut => Raced::Done(value),
            }
        }
        None => Raced::Done(fut.await),
    }
}

/// Long-lived, reusable fetch engine.
pub struct Fetcher {
    config: FetcherConfig,
    transport: Arc<dyn Transport>,
    identities: IdentityRotator,
    fingerprints: FingerprintGenerator,
    proxies: ProxyPool,
    robots: RobotsChecker,
    limiter: RateLimiter,
    stats: FetchStats,
}

impl Fetcher {
    /// Build a fetcher backed by the real HTTP transport.
    pub fn new(config: FetcherConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Build a fetcher over a caller-supplied transport (tests, embedding).
    pub fn with_transport(
        config: FetcherConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            identities: IdentityRotator::new(config.include_mobile_identities),
            fingerprints: FingerprintGenerator::new(),
            proxies: ProxyPool::from_urls(config.proxies.clone()),
            robots: RobotsChecker::new(transport.clone(), config.timeout()),
            limiter: RateLimiter::new(config.min_delay(), config.max_delay()),
            stats: FetchStats::default(),
            config,
            transport,
        })
    }

    /// Swap the identity pool for a caller-supplied one.
    pub fn with_identities(mut self, pool: Vec<String>) -> Result<Self, ConfigError> {
        self.identities = IdentityRotator::with_pool(pool)?;
        Ok(self)
    }

    /// The proxy pool, for marking resets from the outside.
    pub fn proxies(&self) -> &ProxyPool {
        &self.proxies
    }

    /// The rate limiter for this fetcher.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch one URL with default options.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        self.fetch_with(url, &FetchOptions::default()).await
    }

    /// Fetch one URL. Never returns `Err` for per-URL failures; the
    /// outcome is carried on the result.
    pub async fn fetch_with(&self, url: &str, options: &FetchOptions) -> FetchResult {
        self.stats.record_request();

        let identity = self.identities.random().to_string();

        if self.config.respect_policy {
            if !self.robots.can_fetch(url, &identity).await {
                warn!("Disallowed by robots.txt: {}", url);
                self.stats.record_blocked();
                return FetchResult::policy_denied(url);
            }
            if let Some(delay) = self.robots.crawl_delay(url, &identity).await {
                debug!("Origin requests crawl delay {:?} for {}", delay, url);
                self.limiter.raise_floor(delay).await;
            }
        }

        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());
        let cancel = options.cancel.as_ref();

        let attempts = self.config.max_retries + 1;
        let mut last_error = String::new();
        let mut last_status: Option<u16> = None;

        for attempt in 1..=attempts {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return self.cancelled(url);
                }
            }

            if let Raced::Cancelled = race(cancel, self.limiter.wait()).await {
                return self.cancelled(url);
            }

            let mut headers = self.fingerprints.generate(self.identities.random());
            headers.extend(options.headers.clone());

            let proxy = self.proxies.select();

            let start = Instant::now();
            let sent = race(
                cancel,
                self.transport.send(TransportRequest {
                    url,
                    headers: &headers,
                    proxy: proxy.as_ref(),
                    timeout,
                }),
            )
            .await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            let response = match sent {
                Raced::Cancelled => return self.cancelled(url),
                Raced::Done(Err(e)) => {
                    if let Some(p) = &proxy {
                        self.proxies.mark_failed(p);
                    }
                    self.limiter.record_error().await;
                    last_error = e.to_string();
                    last_status = None;
                    warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt, attempts, url, last_error
                    );
                    if attempt < attempts {
                        self.stats.record_retried();
                    }
                    continue;
                }
                Raced::Done(Ok(response)) => response,
            };

            match classify(response.status) {
                Disposition::Success => {
                    self.limiter.record_success().await;
                    self.stats.record_success();
                    debug!("Fetched {} in {}ms", url, elapsed_ms);
                    return FetchResult::success(
                        url,
                        response.status,
                        response.body,
                        response.headers,
                        elapsed_ms,
                    );
                }
                Disposition::Blocked => {
                    warn!("HTTP 403 for {} - not retrying", url);
                    self.stats.record_blocked();
                    self.limiter.record_error().await;
                    return FetchResult::http_error(
                        url,
                        response.status,
                        "HTTP 403 Forbidden".to_string(),
                        response.headers,
                        elapsed_ms,
                    );
                }
                Disposition::Terminal => {
                    warn!("HTTP {} for {}", response.status, url);
                    return FetchResult::http_error(
                        url,
                        response.status,
                        format!("HTTP {}", response.status),
                        response.headers,
                        elapsed_ms,
                    );
                }
                Disposition::Retry => {
                    self.limiter.record_error().await;
                    last_error = format!("HTTP {}", response.status);
                    last_status = Some(response.status);
                    warn!(
                        "Attempt {}/{} for {}: {} (retryable)",
                        attempt, attempts, url, last_error
                    );
                    if attempt < attempts {
                        self.stats.record_retried();
                    }
                }
            }
        }

        self.stats.record_failed();
        let error = format!("retry budget exhausted: {}", last_error);
        match last_status {
            Some(status) => {
                FetchResult::http_error(url, status, error, HashMap::new(), 0)
            }
            None => FetchResult::transport_error(url, error),
        }
    }

    fn cancelled(&self, url: &str) -> FetchResult {
        debug!("Fetch cancelled: {}", url);
        self.stats.record_failed();
        FetchResult::transport_error(url, "cancelled".to_string())
    }

    /// Fetch URLs sequentially, in order, invoking `on_result` after each.
    pub async fn fetch_many<F>(&self, urls: &[String], mut on_result: F) -> Vec<FetchResult>
    where
        F: FnMut(&FetchResult),
    {
        let mut results = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            info!("[{}/{}] Fetching {}", i + 1, urls.len(), url);
            let result = self.fetch(url).await;
            on_result(&result);
            results.push(result);
        }
        results
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
