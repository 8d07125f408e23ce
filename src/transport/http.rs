//! reqwest-backed transport.
//!
//! reqwest binds proxies at the client level, so one client serves direct
//! connections and additional clients are built lazily per proxy endpoint
//! and cached for reuse.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};
use tokio::sync::RwLock;
use tracing::warn;

use super::{Transport, TransportError, TransportRequest, TransportResponse};

/// HTTP transport with a per-proxy client cache.
pub struct HttpTransport {
    direct: Client,
    proxied: RwLock<HashMap<String, Client>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            direct: Self::builder().build()?,
            proxied: RwLock::new(HashMap::new()),
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        // Session cookies persist across requests within one client
        Client::builder().cookie_store(true).gzip(true).brotli(true)
    }

    /// Get or build the client for the given proxy endpoint.
    async fn client_for(&self, proxy_url: &str) -> Result<Client, TransportError> {
        {
            let proxied = self.proxied.read().await;
            if let Some(client) = proxied.get(proxy_url) {
                return Ok(client.clone());
            }
        }

        let mut proxied = self.proxied.write().await;
        if let Some(client) = proxied.get(proxy_url) {
            return Ok(client.clone());
        }

        let proxy =
            Proxy::all(proxy_url).map_err(|e| TransportError::Proxy(e.to_string()))?;
        let client = Self::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| TransportError::Proxy(e.to_string()))?;
        proxied.insert(proxy_url.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let client = match request.proxy {
            Some(endpoint) => self.client_for(endpoint.url()).await?,
            None => self.direct.clone(),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers {
            match (
                HeaderName::from_str(name),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid header: {}", name),
            }
        }

        let response = client
            .get(request.url)
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, &request))?;

        let status = response.status().as_u16();

        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                response_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(e, &request))?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

fn classify_reqwest_error(error: reqwest::Error, request: &TransportRequest<'_>) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(request.timeout)
    } else if error.is_connect() {
        if request.proxy.is_some() {
            TransportError::Proxy(error.to_string())
        } else {
            TransportError::Connect(error.to_string())
        }
    } else {
        TransportError::Other(error.to_string())
    }
}
