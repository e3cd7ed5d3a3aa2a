//! Endpoint liveness and latency probing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use tracing::debug;

use txlab_chain::{ChainFamily, RpcEndpoint};

use crate::jsonrpc::{JsonRpcRequest, has_rpc_error};
use crate::transport::RpcTransport;

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Reachable(Duration),
    Unreachable,
}

impl Latency {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable(_))
    }

    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Self::Reachable(d) => Some(d.as_millis() as u64),
            Self::Unreachable => None,
        }
    }
}

/// Milliseconds, or the string `"unreachable"`.
impl Serialize for Latency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_millis() {
            Some(ms) => serializer.serialize_u64(ms),
            None => serializer.serialize_str("unreachable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub url: String,
    pub latency: Latency,
    /// Epoch milliseconds when the probe completed.
    pub timestamp: i64,
}

impl ProbeResult {
    /// A result stamped with the current time.
    pub fn new(url: impl Into<String>, latency: Latency) -> Self {
        Self::at(url, latency, chrono::Utc::now().timestamp_millis())
    }

    pub fn at(url: impl Into<String>, latency: Latency, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            latency,
            timestamp,
        }
    }
}

/// Strictly lowest latency wins; on a tie the earlier entry is kept.
pub fn select_best(results: &[ProbeResult]) -> Option<&ProbeResult> {
    let mut best: Option<(&ProbeResult, Duration)> = None;
    for result in results {
        if let Latency::Reachable(latency) = result.latency {
            match best {
                Some((_, current)) if latency >= current => {}
                _ => best = Some((result, latency)),
            }
        }
    }
    best.map(|(result, _)| result)
}

#[async_trait]
pub trait LatencyProber: Send + Sync {
    async fn probe(&self, endpoint: &RpcEndpoint) -> Latency;
}

/// Probes by sending the family's lightweight probe method.
pub struct RpcLatencyProber {
    transport: Arc<dyn RpcTransport>,
    method: &'static str,
    timeout: Duration,
}

impl RpcLatencyProber {
    pub fn new(transport: Arc<dyn RpcTransport>, family: ChainFamily, timeout: Duration) -> Self {
        Self {
            transport,
            method: family.probe_method(),
            timeout,
        }
    }
}

#[async_trait]
impl LatencyProber for RpcLatencyProber {
    async fn probe(&self, endpoint: &RpcEndpoint) -> Latency {
        let body = JsonRpcRequest::new(self.method, Vec::new()).to_value();
        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            self.transport.post_json(&endpoint.url, &body, self.timeout),
        )
        .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(resp)) if !has_rpc_error(&resp) => {
                debug!(
                    endpoint = %endpoint.url,
                    latency_ms = elapsed.as_millis() as u64,
                    "Probe succeeded"
                );
                Latency::Reachable(elapsed)
            }
            Ok(Ok(_)) => {
                debug!(endpoint = %endpoint.url, "Probe returned a JSON-RPC error");
                Latency::Unreachable
            }
            Ok(Err(e)) => {
                debug!(endpoint = %endpoint.url, "Probe failed: {e}");
                Latency::Unreachable
            }
            Err(_) => {
                debug!(endpoint = %endpoint.url, "Probe timed out");
                Latency::Unreachable
            }
        }
    }
}
