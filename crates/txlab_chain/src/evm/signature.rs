use alloy_primitives::{B256, Signature, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use txlab_core::codec::{hex_len, hex_to_bytes, is_hex, normalize_hex};
use txlab_core::error::{RECOVERY_FAILED_MESSAGE, ToolboxError};

/// How the signature was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureInput {
    /// 65-byte `r || s || v` or 64-byte `r || s` hex blob.
    Combined(String),
    /// Separate components. A blank or missing `v` means unknown.
    Components {
        r: String,
        s: String,
        v: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredSigner {
    /// Checksummed signer address.
    pub address: String,
    /// The `v` (27 or 28) the address was recovered with.
    pub v: u8,
}

/// Outcome of one recovery procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    Recovered { address: String, v: u8 },
    Failed,
}

struct ParsedSignature {
    r: U256,
    s: U256,
    v: Option<u8>,
}

/// Recover the signer of a 32-byte prehash.
///
/// An explicit `v` must be 27 or 28 and is the only one tried. An unknown
/// `v` tries 27, then 28.
pub fn recover_signer(hash: &str, input: &SignatureInput) -> Result<RecoveredSigner, ToolboxError> {
    let hash = parse_hash(hash)?;
    let parsed = match input {
        SignatureInput::Combined(sig) => parse_combined(sig)?,
        SignatureInput::Components { r, s, v } => parse_components(r, s, v.as_deref())?,
    };

    match recover(&hash, &parsed) {
        Recovery::Recovered { address, v } => Ok(RecoveredSigner { address, v }),
        Recovery::Failed => Err(ToolboxError::RecoveryFailure(
            RECOVERY_FAILED_MESSAGE.to_string(),
        )),
    }
}

fn recover(hash: &B256, sig: &ParsedSignature) -> Recovery {
    let candidates: &[u8] = match sig.v {
        Some(27) => &[27],
        Some(28) => &[28],
        Some(other) => {
            debug!(v = other, "Refusing recovery with a v outside 27/28");
            return Recovery::Failed;
        }
        None => &[27, 28],
    };

    for &v in candidates {
        let signature = Signature::new(sig.r, sig.s, v == 28);
        match signature.recover_address_from_prehash(hash) {
            Ok(address) => {
                return Recovery::Recovered {
                    address: address.to_checksum(None),
                    v,
                };
            }
            Err(e) => debug!(v, "Signature recovery attempt failed: {e}"),
        }
    }
    Recovery::Failed
}

fn parse_hash(hash: &str) -> Result<B256, ToolboxError> {
    let normalized = normalize_hex(hash);
    if !is_hex(&normalized) {
        return Err(ToolboxError::validation(
            "Invalid hash format. Please provide a valid hex string.",
        ));
    }
    if hex_len(&normalized) != 64 {
        return Err(ToolboxError::validation(
            "Hash must be 32 bytes (64 hex characters).",
        ));
    }
    let bytes = hex_to_bytes(&normalized, "Hash")?;
    Ok(B256::from_slice(&bytes))
}

fn parse_combined(signature: &str) -> Result<ParsedSignature, ToolboxError> {
    if signature.trim().is_empty() {
        return Err(ToolboxError::validation("Please provide a signature."));
    }
    let normalized = normalize_hex(signature);
    let invalid = || {
        ToolboxError::validation(
            "Invalid signature format. Expected 65 bytes (130 hex characters) or 64 bytes (128 hex characters).",
        )
    };
    if !is_hex(&normalized) {
        return Err(invalid());
    }
    let bytes = match hex_len(&normalized) {
        128 | 130 => hex_to_bytes(&normalized, "Signature")?,
        _ => return Err(invalid()),
    };

    let v = match bytes.get(64) {
        None => None,
        Some(0) | Some(27) => Some(27),
        Some(1) | Some(28) => Some(28),
        Some(_) => return Err(ToolboxError::validation("v must be 27 or 28.")),
    };

    Ok(ParsedSignature {
        r: U256::from_be_slice(&bytes[..32]),
        s: U256::from_be_slice(&bytes[32..64]),
        v,
    })
}

fn parse_components(r: &str, s: &str, v: Option<&str>) -> Result<ParsedSignature, ToolboxError> {
    if r.trim().is_empty() || s.trim().is_empty() {
        return Err(ToolboxError::validation("Please provide both r and s values."));
    }
    let r = parse_scalar(r, "r")?;
    let s = parse_scalar(s, "s")?;

    let v = match v.map(str::trim).filter(|v| !v.is_empty()) {
        None => None,
        Some(text) => match text.parse::<u64>() {
            Ok(27) => Some(27),
            Ok(28) => Some(28),
            _ => return Err(ToolboxError::validation("v must be 27 or 28.")),
        },
    };

    Ok(ParsedSignature { r, s, v })
}

fn parse_scalar(value: &str, field: &str) -> Result<U256, ToolboxError> {
    let normalized = normalize_hex(value);
    if !is_hex(&normalized) || hex_len(&normalized) != 64 {
        return Err(ToolboxError::validation(format!(
            "Invalid {field} format. Must be 32 bytes (64 hex characters)."
        )));
    }
    let bytes = hex_to_bytes(&normalized, field)?;
    Ok(U256::from_be_slice(&bytes))
}
