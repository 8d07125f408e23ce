//! robots.txt policy checking with a per-origin cache.
//!
//! Policy is fetched lazily, once per origin (scheme+host+port), and kept
//! for the lifetime of the checker. A failed or non-2xx policy fetch is
//! treated as "no policy": the origin is fully allowed (fail-open).

mod parser;

pub use parser::RobotsPolicy;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::transport::{Transport, TransportRequest};

/// Answers "may I fetch this path?" and "how fast?" per origin.
pub struct RobotsChecker {
    transport: Arc<dyn Transport>,
    fetch_timeout: Duration,
    // Keyed by origin serialization, e.g. "https://example.com"
    cache: RwLock<HashMap<String, RobotsPolicy>>,
}

impl RobotsChecker {
    pub fn new(transport: Arc<dyn Transport>, fetch_timeout: Duration) -> Self {
        Self {
            transport,
            fetch_timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the URL's path is allowed for the given identity.
    /// Unparseable URLs and unreadable policies fail open.
    pub async fn can_fetch(&self, url: &str, identity: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let origin = parsed.origin().ascii_serialization();

        {
            let cache = self.cache.read().await;
            if let Some(policy) = cache.get(&origin) {
                return policy.is_allowed(parsed.path(), identity);
            }
        }

        // Single flight: the write lock is held across the policy fetch,
        // so concurrent first lookups never duplicate the work.
        let mut cache = self.cache.write().await;
        if let Some(policy) = cache.get(&origin) {
            return policy.is_allowed(parsed.path(), identity);
        }

        let policy = self.fetch_policy(&origin, identity).await;
        let allowed = policy.is_allowed(parsed.path(), identity);
        cache.insert(origin, policy);
        allowed
    }

    /// The cached crawl delay for the URL's origin, if any. Only consults
    /// the cache; `can_fetch` populates it.
    pub async fn crawl_delay(&self, url: &str, identity: &str) -> Option<Duration> {
        let parsed = Url::parse(url).ok()?;
        let origin = parsed.origin().ascii_serialization();
        let cache = self.cache.read().await;
        cache.get(&origin).and_then(|p| p.crawl_delay(identity))
    }

    async fn fetch_policy(&self, origin: &str, identity: &str) -> RobotsPolicy {
        let robots_url = format!("{}/robots.txt", origin);
        let headers = HashMap::from([("User-Agent".to_string(), identity.to_string())]);

        let result = self
            .transport
            .send(TransportRequest {
                url: &robots_url,
                headers: &headers,
                proxy: None,
                timeout: self.fetch_timeout,
            })
            .await;

        match result {
            Ok(response) if (200..300).contains(&response.status) => {
                debug!("Fetched policy for {}", origin);
                RobotsPolicy::parse(&String::from_utf8_lossy(&response.body))
            }
            Ok(response) => {
                debug!(
                    "Policy fetch for {} returned HTTP {}, allowing all",
                    origin, response.status
                );
                RobotsPolicy::default()
            }
            Err(e) => {
                warn!("Could not read policy for {}: {}, allowing all", origin, e);
                RobotsPolicy::default()
            }
        }
    }
}
