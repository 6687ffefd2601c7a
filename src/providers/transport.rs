//! Outbound HTTP seam between descriptors and the network.

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use std::fmt;
use thiserror::Error;

/// Errors raised before any HTTP response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, or body transfer failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fully built, authenticated request.
pub struct OutboundRequest {
    /// `POST` for prompts, `GET` for model listings.
    pub method: Method,
    /// Target URL, possibly carrying a credential in its query string.
    pub url: Url,
    /// Extra request headers, possibly carrying a credential.
    pub headers: Vec<(&'static str, String)>,
    /// JSON payload, absent on `GET`.
    pub body: Option<serde_json::Value>,
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("host", &self.url.host_str())
            .field("path", &self.url.path())
            .field("headers", &headers)
            .finish_non_exhaustive()
    }
}

/// Raw response captured from a backend.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl InboundResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Generic request/response mechanism used for every dispatch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response, whatever its status.
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the crate user agent and default pool settings.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("askdocs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method, url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(InboundResponse { status, body })
    }
}
