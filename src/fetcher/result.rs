//! Fetch outcome types.
//!
//! Failures are data, not errors: a batch caller iterates results and
//! keeps going past individual failures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final classification of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchOutcome {
    /// HTTP 200 with body.
    Success,
    /// A terminal non-200 status (including 403 and exhausted retryable
    /// statuses).
    HttpError,
    /// Connection/proxy/timeout failure after the retry budget, or
    /// cancellation.
    TransportError,
    /// robots.txt disallows the path; no network call was made.
    PolicyDenied,
}

/// The outcome of one logical fetch (all retries included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub outcome: FetchOutcome,
    /// HTTP status of the last attempt, when one was observed.
    pub status: Option<u16>,
    /// Response body; only populated on success.
    #[serde(skip)]
    pub body: Vec<u8>,
    /// Response headers of the last attempt.
    #[serde(skip)]
    pub headers: HashMap<String, String>,
    /// Wall time of the last network attempt.
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub(crate) fn success(
        url: &str,
        status: u16,
        body: Vec<u8>,
        headers: HashMap<String, String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            url: url.to_string(),
            outcome: FetchOutcome::Success,
            status: Some(status),
            body,
            headers,
            elapsed_ms,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    pub(crate) fn http_error(
        url: &str,
        status: u16,
        error: String,
        headers: HashMap<String, String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            url: url.to_string(),
            outcome: FetchOutcome::HttpError,
            status: Some(status),
            body: Vec::new(),
            headers,
            elapsed_ms,
            error: Some(error),
            fetched_at: Utc::now(),
        }
    }

    pub(crate) fn transport_error(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            outcome: FetchOutcome::TransportError,
            status: None,
            body: Vec::new(),
            headers: HashMap::new(),
            elapsed_ms: 0,
            error: Some(error),
            fetched_at: Utc::now(),
        }
    }

    pub(crate) fn policy_denied(url: &str) -> Self {
        Self {
            url: url.to_string(),
            outcome: FetchOutcome::PolicyDenied,
            status: None,
            body: Vec::new(),
            headers: HashMap::new(),
            elapsed_ms: 0,
            error: Some("disallowed by robots.txt".to_string()),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == FetchOutcome::Success
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
