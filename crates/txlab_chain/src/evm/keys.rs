use alloy_primitives::Address;
use k256::ecdsa::SigningKey;
use tracing::debug;

use txlab_core::codec::{hex_len, hex_to_bytes, is_hex, normalize_hex};
use txlab_core::error::ToolboxError;

/// Derive the checksummed EVM address of a raw secp256k1 private key.
pub fn private_key_to_address(input: &str) -> Result<String, ToolboxError> {
    if input.trim().is_empty() {
        return Err(ToolboxError::validation("Please provide a private key."));
    }
    let normalized = normalize_hex(input);
    if !is_hex(&normalized) {
        return Err(ToolboxError::validation(
            "Invalid private key format. Please provide a valid hex string.",
        ));
    }
    if hex_len(&normalized) != 64 {
        return Err(ToolboxError::validation(
            "Private key must be 32 bytes (64 hex characters).",
        ));
    }

    let bytes = hex_to_bytes(&normalized, "Private key")?;
    let key = SigningKey::from_slice(&bytes).map_err(|e| {
        debug!("Rejected private key scalar: {e}");
        ToolboxError::validation(
            "Failed to convert private key to address. Please check your input.",
        )
    })?;
    Ok(Address::from_private_key(&key).to_checksum(None))
}
