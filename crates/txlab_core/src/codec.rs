//! Hex, base-58 and base-64 conversion helpers plus validation predicates.
//!
//! Every decoder in the workspace funnels user input through these functions
//! so that prefix handling and error wording stay consistent.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ToolboxError;

/// Trim, lowercase and ensure a `0x` prefix.
pub fn normalize_hex(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    if trimmed.starts_with("0x") {
        trimmed
    } else {
        format!("0x{trimmed}")
    }
}

/// Strip a leading `0x`/`0X`, if any.
pub fn strip_0x(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Whether `input` is hex digits with an optional `0x` prefix. The empty body
/// (`""` or `"0x"`) counts as hex.
pub fn is_hex(input: &str) -> bool {
    strip_0x(input).chars().all(|c| c.is_ascii_hexdigit())
}

/// Number of hex digits after the optional prefix.
pub fn hex_len(input: &str) -> usize {
    strip_0x(input).len()
}

/// Decode a hex string (optional prefix) into bytes.
///
/// `field` names the input in the validation message.
pub fn hex_to_bytes(input: &str, field: &str) -> Result<Vec<u8>, ToolboxError> {
    let body = strip_0x(input.trim());
    if !is_hex(body) {
        return Err(ToolboxError::validation(format!(
            "{field} must be a hex string"
        )));
    }
    if body.len() % 2 != 0 {
        return Err(ToolboxError::validation(format!(
            "{field} must contain an even number of hex characters"
        )));
    }
    hex::decode(body)
        .map_err(|_| ToolboxError::validation(format!("{field} must be a hex string")))
}

/// Decode hex into bytes, left-padding odd-length input with a single `0`.
///
/// This matches how the common JavaScript hex utilities treat odd-length
/// strings, which matters for byte-exact hash reproduction.
pub fn hex_to_bytes_padded(input: &str) -> Result<Vec<u8>, ToolboxError> {
    let body = strip_0x(input);
    if !is_hex(body) {
        return Err(ToolboxError::validation("value must be a hex string"));
    }
    let padded;
    let even = if body.len() % 2 == 1 {
        padded = format!("0{body}");
        padded.as_str()
    } else {
        body
    };
    hex::decode(even).map_err(|_| ToolboxError::validation("value must be a hex string"))
}

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn bytes_to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Whether `input` only uses the Bitcoin base-58 alphabet.
pub fn is_base58(input: &str) -> bool {
    !input.is_empty() && bs58::decode(input).into_vec().is_ok()
}

pub fn decode_base58(input: &str) -> Result<Vec<u8>, ToolboxError> {
    bs58::decode(input.trim())
        .into_vec()
        .map_err(|_| ToolboxError::validation("value is not valid base-58"))
}

pub fn encode_base58(bytes: impl AsRef<[u8]>) -> String {
    bs58::encode(bytes).into_string()
}

pub fn decode_base64(input: &str) -> Result<Vec<u8>, ToolboxError> {
    STANDARD
        .decode(input.trim())
        .map_err(|_| ToolboxError::validation("value is not valid base-64"))
}

pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}
