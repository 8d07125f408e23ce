//! End-to-end fetch scenarios over a scripted transport.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use robustfetch::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use robustfetch::{FetchOptions, FetchOutcome, Fetcher, FetcherConfig};

/// One scripted attempt outcome.
enum Step {
    Status(u16, &'static str),
    Error,
}

/// Transport that serves robots.txt from a fixed body and plays back a
/// scripted sequence for everything else.
struct ScriptedTransport {
    robots: Option<&'static str>,
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicUsize,
    last_headers: Mutex<Option<HashMap<String, String>>>,
    last_proxy: Mutex<Option<String>>,
}

impl ScriptedTransport {
    fn new(robots: Option<&'static str>, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            robots,
            steps: Mutex::new(steps.into()),
            attempts: AtomicUsize::new(0),
            last_headers: Mutex::new(None),
            last_proxy: Mutex::new(None),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        if request.url.ends_with("/robots.txt") {
            return match self.robots {
                Some(body) => Ok(TransportResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: body.as_bytes().to_vec(),
                }),
                None => Err(TransportError::Connect("robots unreachable".to_string())),
            };
        }

        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_headers.lock().unwrap() = Some(request.headers.clone());
        *self.last_proxy.lock().unwrap() = request.proxy.map(|p| p.url().to_string());

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport script exhausted");
        match step {
            Step::Status(status, body) => Ok(TransportResponse {
                status,
                headers: HashMap::from([("server".to_string(), "test".to_string())]),
                body: body.as_bytes().to_vec(),
            }),
            Step::Error => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}

/// Config with zero delays so tests run instantly.
fn fast_config() -> FetcherConfig {
    FetcherConfig {
        min_delay_secs: 0.0,
        max_delay_secs: 0.0,
        ..Default::default()
    }
}

fn fetcher(config: FetcherConfig, transport: Arc<ScriptedTransport>) -> Fetcher {
    Fetcher::with_transport(config, transport)
        .unwrap()
        .with_identities(vec!["UA-A".to_string()])
        .unwrap()
}

#[tokio::test]
async fn scenario_a_success_first_attempt() {
    let transport = ScriptedTransport::new(None, vec![Step::Status(200, "ok")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    assert_eq!(result.outcome, FetchOutcome::Success);
    assert_eq!(result.status, Some(200));
    assert_eq!(result.text(), "ok");
    assert_eq!(transport.attempts(), 1);

    let headers = transport.last_headers.lock().unwrap().clone().unwrap();
    assert_eq!(headers.get("User-Agent").map(|s| s.as_str()), Some("UA-A"));

    let stats = fetcher.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn scenario_b_recovers_after_retryable_errors() {
    let transport = ScriptedTransport::new(
        None,
        vec![
            Step::Status(503, ""),
            Step::Status(503, ""),
            Step::Status(200, "ok"),
        ],
    );
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    assert_eq!(result.outcome, FetchOutcome::Success);
    assert_eq!(transport.attempts(), 3);
    assert_eq!(fetcher.rate_limiter().consecutive_errors().await, 0);

    let stats = fetcher.stats();
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.retried, 2);
}

#[tokio::test]
async fn scenario_c_policy_denial_skips_transport() {
    let transport = ScriptedTransport::new(
        Some("User-agent: *\nDisallow: /private/\n"),
        vec![Step::Status(200, "ok")],
    );
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/private/page").await;

    assert_eq!(result.outcome, FetchOutcome::PolicyDenied);
    assert_eq!(result.status, None);
    assert_eq!(transport.attempts(), 0);

    let stats = fetcher.stats();
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.success, 0);

    // Allowed paths on the same origin still go through
    let result = fetcher.fetch("https://x.test/public/page").await;
    assert_eq!(result.outcome, FetchOutcome::Success);
}

#[tokio::test]
async fn retry_budget_exhaustion_counts_one_failure() {
    let config = FetcherConfig {
        max_retries: 2,
        ..fast_config()
    };
    let transport = ScriptedTransport::new(None, vec![Step::Error, Step::Error, Step::Error]);
    let fetcher = fetcher(config, transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    // Initial attempt + max_retries
    assert_eq!(transport.attempts(), 3);
    assert_eq!(result.outcome, FetchOutcome::TransportError);
    assert!(result.error.as_deref().unwrap().contains("connection refused"));

    let stats = fetcher.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retried, 2);
}

#[tokio::test]
async fn retryable_status_exhaustion_keeps_last_status() {
    let config = FetcherConfig {
        max_retries: 1,
        ..fast_config()
    };
    let transport =
        ScriptedTransport::new(None, vec![Step::Status(429, ""), Step::Status(429, "")]);
    let fetcher = fetcher(config, transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    assert_eq!(transport.attempts(), 2);
    assert_eq!(result.outcome, FetchOutcome::HttpError);
    assert_eq!(result.status, Some(429));
    assert_eq!(fetcher.stats().failed, 1);
}

#[tokio::test]
async fn forbidden_is_terminal_on_first_attempt() {
    let transport = ScriptedTransport::new(None, vec![Step::Status(403, "")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    assert_eq!(transport.attempts(), 1);
    assert_eq!(result.outcome, FetchOutcome::HttpError);
    assert_eq!(result.status, Some(403));
    assert_eq!(fetcher.stats().blocked, 1);
    assert_eq!(fetcher.stats().failed, 0);
    // 403 still counts against the backoff state
    assert_eq!(fetcher.rate_limiter().consecutive_errors().await, 1);
}

#[tokio::test]
async fn other_statuses_are_terminal_without_retry() {
    let transport = ScriptedTransport::new(None, vec![Step::Status(404, "")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/missing").await;

    assert_eq!(transport.attempts(), 1);
    assert_eq!(result.outcome, FetchOutcome::HttpError);
    assert_eq!(result.status, Some(404));
    assert_eq!(fetcher.stats().retried, 0);
}

#[tokio::test]
async fn caller_header_overrides_win() {
    let transport = ScriptedTransport::new(None, vec![Step::Status(200, "ok")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let options = FetchOptions {
        headers: HashMap::from([
            ("User-Agent".to_string(), "Custom/1.0".to_string()),
            ("X-Extra".to_string(), "1".to_string()),
        ]),
        ..Default::default()
    };
    fetcher.fetch_with("https://x.test/page", &options).await;

    let headers = transport.last_headers.lock().unwrap().clone().unwrap();
    assert_eq!(
        headers.get("User-Agent").map(|s| s.as_str()),
        Some("Custom/1.0")
    );
    assert_eq!(headers.get("X-Extra").map(|s| s.as_str()), Some("1"));
    // Generated fingerprint headers survive the merge
    assert!(headers.contains_key("Accept"));
}

#[tokio::test]
async fn crawl_delay_raises_rate_limit_floor() {
    let transport = ScriptedTransport::new(
        Some("User-agent: *\nCrawl-delay: 7\n"),
        vec![Step::Status(200, "ok")],
    );
    let fetcher = fetcher(fast_config(), transport.clone());

    fetcher.fetch("https://x.test/page").await;

    let (min, max) = fetcher.rate_limiter().delay_bounds().await;
    assert_eq!(min, Duration::from_secs(7));
    assert!(max >= min);
}

#[tokio::test]
async fn failed_proxy_is_excluded_after_transport_error() {
    let config = FetcherConfig {
        proxies: vec!["http://proxy-a:8080".to_string()],
        ..fast_config()
    };
    let transport = ScriptedTransport::new(None, vec![Step::Error, Step::Status(200, "ok")]);
    let fetcher = fetcher(config, transport.clone());

    let result = fetcher.fetch("https://x.test/page").await;

    assert_eq!(result.outcome, FetchOutcome::Success);
    // First attempt used the proxy; after it failed the retry went direct
    assert_eq!(*transport.last_proxy.lock().unwrap(), None);
    assert!(fetcher.proxies().select().is_none());

    fetcher.proxies().reset_failed();
    assert!(fetcher.proxies().select().is_some());
}

#[tokio::test]
async fn cancelled_token_aborts_before_dispatch() {
    let transport = ScriptedTransport::new(None, vec![Step::Status(200, "ok")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let token = CancellationToken::new();
    token.cancel();
    let options = FetchOptions {
        cancel: Some(token),
        ..Default::default()
    };

    let result = fetcher.fetch_with("https://x.test/page", &options).await;

    assert_eq!(result.outcome, FetchOutcome::TransportError);
    assert_eq!(result.error.as_deref(), Some("cancelled"));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn fetch_many_preserves_order_and_reports_progress() {
    let transport = ScriptedTransport::new(
        None,
        vec![
            Step::Status(200, "first"),
            Step::Status(404, ""),
            Step::Status(200, "third"),
        ],
    );
    let fetcher = fetcher(fast_config(), transport.clone());

    let urls = vec![
        "https://x.test/1".to_string(),
        "https://x.test/2".to_string(),
        "https://x.test/3".to_string(),
    ];
    let mut seen = Vec::new();
    let results = fetcher
        .fetch_many(&urls, |result| seen.push(result.url.clone()))
        .await;

    assert_eq!(seen, urls);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].text(), "first");
    assert_eq!(results[1].outcome, FetchOutcome::HttpError);
    assert_eq!(results[2].text(), "third");

    let stats = fetcher.stats();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.success, 2);
}

#[tokio::test]
async fn robots_fetch_failure_fails_open() {
    // robots: None makes the policy fetch error out; fetching must proceed
    let transport = ScriptedTransport::new(None, vec![Step::Status(200, "ok")]);
    let fetcher = fetcher(fast_config(), transport.clone());

    let result = fetcher.fetch("https://x.test/anything").await;
    assert_eq!(result.outcome, FetchOutcome::Success);
}
