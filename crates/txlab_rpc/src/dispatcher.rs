//! Sends user-composed JSON-RPC calls and records them in the call history.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use txlab_chain::RpcEndpoint;
use txlab_core::error::ToolboxError;

use crate::history::{CallHistory, CallHistoryItem};
use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, has_rpc_error};
use crate::transport::{RpcTransport, TransportError};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse free-form parameter text. Blank text means no parameters.
pub fn parse_params(text: &str) -> Result<Vec<Value>, ToolboxError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(params)) => Ok(params),
        Ok(_) => Err(ToolboxError::validation("Parameters must be in array format")),
        Err(_) => Err(ToolboxError::validation(
            "Invalid parameter format, please enter a valid JSON array",
        )),
    }
}

/// A completed round trip. The response may still carry a JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCallOutcome {
    pub response: Value,
    pub duration_ms: u64,
}

impl RpcCallOutcome {
    pub fn is_rpc_error(&self) -> bool {
        has_rpc_error(&self.response)
    }

    pub fn rpc_error(&self) -> Option<JsonRpcError> {
        serde_json::from_value::<JsonRpcResponse>(self.response.clone())
            .ok()
            .and_then(|response| response.error)
    }
}

pub struct CallDispatcher {
    transport: Arc<dyn RpcTransport>,
    history: CallHistory,
    timeout: Duration,
}

impl CallDispatcher {
    pub fn new(transport: Arc<dyn RpcTransport>, history: CallHistory) -> Self {
        Self {
            transport,
            history,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn history(&self) -> &CallHistory {
        &self.history
    }

    /// Validate `params_text` and dispatch. Nothing is sent when validation fails.
    pub async fn call_text(
        &self,
        endpoint: &RpcEndpoint,
        method: &str,
        params_text: &str,
    ) -> Result<RpcCallOutcome, ToolboxError> {
        let method = validate_call(endpoint, method)?;
        let params = parse_params(params_text)?;
        self.dispatch(endpoint, method, params).await
    }

    pub async fn call(
        &self,
        endpoint: &RpcEndpoint,
        method: &str,
        params: Vec<Value>,
    ) -> Result<RpcCallOutcome, ToolboxError> {
        let method = validate_call(endpoint, method)?;
        self.dispatch(endpoint, method, params).await
    }

    async fn dispatch(
        &self,
        endpoint: &RpcEndpoint,
        method: &str,
        params: Vec<Value>,
    ) -> Result<RpcCallOutcome, ToolboxError> {
        let request = JsonRpcRequest::new(method, params.clone());
        let body = request.to_value();
        let entry = CallHistoryItem::new(endpoint.network.clone(), &endpoint.url, method, params);

        let start = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.transport.post_json(&endpoint.url, &body, self.timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout.as_millis() as u64)),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                info!(
                    endpoint = %endpoint.url,
                    method,
                    id = request.id,
                    duration_ms,
                    rpc_error = has_rpc_error(&response),
                    "RPC call completed"
                );
                self.record(entry.with_response(response.clone(), duration_ms));
                Ok(RpcCallOutcome {
                    response,
                    duration_ms,
                })
            }
            Err(e) => {
                warn!(endpoint = %endpoint.url, method, duration_ms, "RPC call failed: {e}");
                self.record(entry.with_error(e.to_string(), duration_ms));
                Err(e.into_toolbox(duration_ms))
            }
        }
    }

    fn record(&self, item: CallHistoryItem) {
        if let Err(e) = self.history.push(item) {
            warn!("Failed to persist call history: {e:#}");
        }
    }
}

fn validate_call<'a>(endpoint: &RpcEndpoint, method: &'a str) -> Result<&'a str, ToolboxError> {
    if endpoint.url.trim().is_empty() {
        return Err(ToolboxError::validation("Please select an RPC endpoint"));
    }
    let method = method.trim();
    if method.is_empty() {
        return Err(ToolboxError::validation("Please select or enter a method name"));
    }
    Ok(method)
}
