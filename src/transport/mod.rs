//! Transport seam between the fetch orchestrator and the network.
//!
//! The orchestrator treats the transport as an opaque dependency: one
//! `send` call per attempt, bounded by a timeout. Tests script outcomes
//! by swapping in their own implementation.

mod http;

pub use http::HttpTransport;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::proxy::ProxyEndpoint;

/// One outbound request, fully assembled by the orchestrator.
#[derive(Debug)]
pub struct TransportRequest<'a> {
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub proxy: Option<&'a ProxyEndpoint>,
    pub timeout: Duration,
}

/// Raw response: status, headers, body bytes.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Transport-level failures. All of these are retryable from the
/// orchestrator's point of view.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Dispatches a single HTTP GET and returns the raw outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest<'_>)
        -> Result<TransportResponse, TransportError>;
}
