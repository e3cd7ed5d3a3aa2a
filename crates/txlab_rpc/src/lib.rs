// Endpoint probing and selection, JSON-RPC dispatch and call history.

pub mod curl;
pub mod custom_endpoints;
pub mod dispatcher;
pub mod history;
pub mod jsonrpc;
pub mod latency_cache;
pub mod orchestrator;
pub mod prober;
pub mod transport;

// Re-export primary types for convenient access.
pub use curl::generate_curl_command;
pub use custom_endpoints::CustomEndpointStore;
pub use dispatcher::{CallDispatcher, RpcCallOutcome, parse_params};
pub use history::{CallHistory, CallHistoryItem};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use latency_cache::LatencyCache;
pub use orchestrator::{EndpointOrchestrator, OrchestratorSnapshot, ProbeState};
pub use prober::{Latency, LatencyProber, ProbeResult, RpcLatencyProber, select_best};
pub use transport::{HttpTransport, RpcTransport, TransportError};
