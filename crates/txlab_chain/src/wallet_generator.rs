//! Deterministic wallet generation from memorable characters.
//!
//! Each character found in the BIP-39 simplified-Chinese wordlist contributes
//! its word index (unpadded lowercase hex) to a first-stage entropy string of
//! at most 64 hex digits. That string is hashed, optionally combined with a
//! hashed salt and hashed again; the final 256-bit value is the BIP-39
//! entropy of a 24-word English mnemonic. The address is the standard
//! Ethereum account at `m/44'/60'/0'/0/0`.
//!
//! The pipeline is reproduced bit for bit so previously generated wallets
//! can be regenerated from the same characters and salt.

use alloy_primitives::{Address, keccak256};
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use txlab_core::codec::hex_to_bytes_padded;
use txlab_core::error::ToolboxError;

const ENTROPY_HEX_DIGITS: usize = 64;
const ETH_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedWord {
    pub character: String,
    /// Wordlist index as unpadded lowercase hex.
    pub index_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWallet {
    pub mnemonic: String,
    pub address: String,
    pub selected_words: Vec<SelectedWord>,
    /// Final 256-bit entropy as lowercase hex, no prefix.
    pub entropy: String,
}

/// Generate the wallet for `chars` and an optional `salt`.
///
/// Whitespace and characters outside the wordlist are skipped. A missing or
/// empty salt contributes nothing to the final hash.
pub fn generate_wallet(chars: &str, salt: Option<&str>) -> Result<GeneratedWallet, ToolboxError> {
    let (selected_words, first_stage) = collect_entropy(chars);
    let entropy = derive_entropy(&first_stage, salt)?;

    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy.as_slice())
        .map_err(|e| ToolboxError::decode(format!("Failed to build mnemonic: {e}")))?;
    let address = derive_address(&mnemonic)?;

    debug!(
        selected = selected_words.len(),
        address = %address,
        "Generated deterministic wallet"
    );

    Ok(GeneratedWallet {
        mnemonic: mnemonic.to_string(),
        address,
        selected_words,
        entropy: hex::encode(entropy),
    })
}

/// Map characters to wordlist indices and build the first-stage hex string.
fn collect_entropy(chars: &str) -> (Vec<SelectedWord>, String) {
    let mut selected = Vec::new();
    let mut hex = String::new();
    let mut buf = [0u8; 4];

    for c in chars.chars().filter(|c| !c.is_whitespace()) {
        let Some(index) = Language::SimplifiedChinese.find_word(c.encode_utf8(&mut buf)) else {
            continue;
        };
        let fragment = format!("{index:x}");
        if hex.len() < ENTROPY_HEX_DIGITS {
            hex.push_str(&fragment);
        }
        selected.push(SelectedWord {
            character: c.to_string(),
            index_hex: fragment,
        });
    }

    hex.truncate(ENTROPY_HEX_DIGITS);
    (selected, hex)
}

/// keccak(keccak(first_stage) ++ keccak(salt)), with the salt term omitted
/// when there is no salt.
fn derive_entropy(first_stage: &str, salt: Option<&str>) -> Result<[u8; 32], ToolboxError> {
    let stage_bytes = hex_to_bytes_padded(first_stage)?;
    let mut preimage = keccak256(&stage_bytes).to_vec();
    if let Some(salt) = salt.filter(|s| !s.is_empty()) {
        preimage.extend_from_slice(keccak256(salt.as_bytes()).as_slice());
    }
    Ok(keccak256(&preimage).0)
}

fn derive_address(mnemonic: &Mnemonic) -> Result<String, ToolboxError> {
    let seed = mnemonic.to_seed("");
    let path: DerivationPath = ETH_DERIVATION_PATH
        .parse()
        .map_err(|e| ToolboxError::decode(format!("Invalid derivation path: {e}")))?;
    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| ToolboxError::decode(format!("Key derivation failed: {e}")))?;
    Ok(Address::from_private_key(xprv.private_key()).to_checksum(None))
}
