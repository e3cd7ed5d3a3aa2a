use serde_json::Value;

use crate::jsonrpc::JsonRpcRequest;

/// Build a copy-pasteable cURL command reproducing a JSON-RPC call.
///
/// The body always uses `id: 1`. It is not meant to be executed by us.
pub fn generate_curl_command(endpoint: &str, method: &str, params: &[Value]) -> String {
    let request = JsonRpcRequest::with_id(method, params.to_vec(), 1);
    // Struct serialization keeps the jsonrpc/method/params/id field order.
    let body = serde_json::to_string(&request).unwrap_or_else(|_| request.to_value().to_string());
    format!(
        "curl -X POST '{}' \\\n  -H 'Content-Type: application/json' \\\n  -d '{}'",
        single_quote_escape(endpoint),
        single_quote_escape(&body)
    )
}

/// Escape backslashes, then close-escape-reopen every single quote.
fn single_quote_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "'\\''")
}
