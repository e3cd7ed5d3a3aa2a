//! HTTP transport for JSON-RPC requests.
//!
//! Both the latency prober and the call dispatcher post through an
//! [`RpcTransport`], so tests can swap in an in-process fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use txlab_core::error::ToolboxError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised before a usable response body exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Convert into the toolbox taxonomy, attaching the elapsed duration.
    pub fn into_toolbox(self, duration_ms: u64) -> ToolboxError {
        ToolboxError::transport(self.to_string(), Some(duration_ms))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// POST `body` as JSON to `url` and return the parsed JSON response.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// [`RpcTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("txlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout.as_millis() as u64)
            } else {
                TransportError::Network(e.to_string())
            }
        };

        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            debug!(endpoint = %url, %status, "RPC endpoint returned non-success status");
            return Err(TransportError::Http {
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(classify)?;
        serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
