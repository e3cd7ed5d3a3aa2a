//! Solana transaction decoder.
//!
//! Accepts a serialized `VersionedTransaction` encoded as base-58 or
//! base-64 and renders the compiled message for display. Signatures are
//! shown as-is; no signer verification is attempted.

use serde::{Deserialize, Serialize, Serializer};
use solana_sdk::transaction::{TransactionVersion, VersionedTransaction};
use tracing::{debug, warn};

use txlab_core::codec::{decode_base58, decode_base64, is_base58};
use txlab_core::error::{SOLANA_DECODE_MESSAGE, ToolboxError};

/// Message version: `"legacy"` or a version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    Number(u8),
}

impl Serialize for MessageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Legacy => serializer.serialize_str("legacy"),
            Self::Number(n) => serializer.serialize_u8(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaInstruction {
    pub program_id_index: u8,
    pub account_key_indexes: Vec<u8>,
    /// Instruction payload as lowercase hex (no prefix).
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressTableLookup {
    pub account_key: String,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaMessage {
    pub header: SolanaHeader,
    pub account_keys: Vec<String>,
    pub recent_blockhash: String,
    pub instructions: Vec<SolanaInstruction>,
    pub address_lookup_table_accounts: Vec<AddressTableLookup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolanaTransaction {
    pub signatures: Vec<String>,
    pub message: SolanaMessage,
    pub version: MessageVersion,
}

/// Decode a base-58 or base-64 serialized Solana transaction.
///
/// Base-58 is tried first; anything that is not valid base-58 is read as
/// base-64. Blank input returns `Ok(None)`.
pub fn decode_solana_transaction(input: &str) -> Result<Option<SolanaTransaction>, ToolboxError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let bytes = if is_base58(input) {
        debug!("Reading Solana transaction as base-58");
        decode_base58(input)?
    } else {
        debug!("Reading Solana transaction as base-64");
        decode_base64(input).map_err(|_| ToolboxError::decode(SOLANA_DECODE_MESSAGE))?
    };
    decode_bytes(&bytes).map(Some)
}

fn decode_bytes(bytes: &[u8]) -> Result<SolanaTransaction, ToolboxError> {
    if bytes.is_empty() {
        return Err(ToolboxError::decode("empty transaction buffer"));
    }
    let tx: VersionedTransaction = bincode::deserialize(bytes).map_err(|e| {
        warn!("Solana transaction deserialization failed: {e}");
        ToolboxError::decode(SOLANA_DECODE_MESSAGE)
    })?;
    Ok(describe(&tx))
}

fn describe(tx: &VersionedTransaction) -> SolanaTransaction {
    let message = &tx.message;
    let header = message.header();

    let instructions = message
        .instructions()
        .iter()
        .map(|ix| SolanaInstruction {
            program_id_index: ix.program_id_index,
            account_key_indexes: ix.accounts.clone(),
            data: hex::encode(&ix.data),
        })
        .collect();

    let address_lookup_table_accounts = message
        .address_table_lookups()
        .unwrap_or_default()
        .iter()
        .map(|lookup| AddressTableLookup {
            account_key: lookup.account_key.to_string(),
            writable_indexes: lookup.writable_indexes.clone(),
            readonly_indexes: lookup.readonly_indexes.clone(),
        })
        .collect();

    SolanaTransaction {
        signatures: tx.signatures.iter().map(|sig| sig.to_string()).collect(),
        message: SolanaMessage {
            header: SolanaHeader {
                num_required_signatures: header.num_required_signatures,
                num_readonly_signed_accounts: header.num_readonly_signed_accounts,
                num_readonly_unsigned_accounts: header.num_readonly_unsigned_accounts,
            },
            account_keys: message
                .static_account_keys()
                .iter()
                .map(|key| key.to_string())
                .collect(),
            recent_blockhash: message.recent_blockhash().to_string(),
            instructions,
            address_lookup_table_accounts,
        },
        version: match tx.version() {
            TransactionVersion::Legacy(_) => MessageVersion::Legacy,
            TransactionVersion::Number(n) => MessageVersion::Number(n),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::CompiledInstruction;
    use solana_sdk::message::v0::{self, MessageAddressTableLookup};
    use solana_sdk::message::{MessageHeader, VersionedMessage};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signature};
    use solana_sdk::signer::Signer;
    use solana_sdk::system_instruction;
    use solana_sdk::transaction::Transaction;
    use txlab_core::codec::{encode_base58, encode_base64};

    fn legacy_transfer() -> (Vec<u8>, Keypair, Pubkey, Hash) {
        let from = Keypair::new();
        let to = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        let ix = system_instruction::transfer(&from.pubkey(), &to, 1_000_000_000);
        let tx = Transaction::new_signed_with_payer(&[ix], Some(&from.pubkey()), &[&from], blockhash);
        (bincode::serialize(&tx).unwrap(), from, to, blockhash)
    }

    #[test]
    fn blank_input_is_a_no_op() {
        assert!(decode_solana_transaction("  ").unwrap().is_none());
    }

    #[test]
    fn decodes_base58_legacy_transfer() {
        let (bytes, from, to, blockhash) = legacy_transfer();
        let tx = decode_solana_transaction(&encode_base58(&bytes)).unwrap().unwrap();

        assert_eq!(tx.version, MessageVersion::Legacy);
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.header.num_required_signatures, 1);
        assert_eq!(tx.message.header.num_readonly_unsigned_accounts, 1);
        assert_eq!(tx.message.account_keys[0], from.pubkey().to_string());
        assert_eq!(tx.message.account_keys[1], to.to_string());
        assert_eq!(tx.message.recent_blockhash, blockhash.to_string());
        assert_eq!(tx.message.instructions.len(), 1);

        let ix = &tx.message.instructions[0];
        assert_eq!(ix.program_id_index, 2);
        assert_eq!(ix.account_key_indexes, vec![0, 1]);
        // System transfer: u32 LE tag 2, then u64 LE lamports.
        assert_eq!(ix.data, "0200000000ca9a3b00000000");
        assert!(tx.message.address_lookup_table_accounts.is_empty());
    }

    #[test]
    fn base64_decodes_to_same_result() {
        let (bytes, ..) = legacy_transfer();
        let from_b58 = decode_solana_transaction(&encode_base58(&bytes)).unwrap();
        let from_b64 = decode_solana_transaction(&encode_base64(&bytes)).unwrap();
        assert_eq!(from_b58, from_b64);
    }

    #[test]
    fn decodes_v0_with_lookup_tables() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let table = Pubkey::new_unique();
        let message = v0::Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![payer, program],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, 2, 3],
                data: vec![0xde, 0xad],
            }],
            address_table_lookups: vec![MessageAddressTableLookup {
                account_key: table,
                writable_indexes: vec![4],
                readonly_indexes: vec![7, 9],
            }],
        };
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        let encoded = encode_base64(bincode::serialize(&tx).unwrap());

        let decoded = decode_solana_transaction(&encoded).unwrap().unwrap();
        assert_eq!(decoded.version, MessageVersion::Number(0));
        assert_eq!(decoded.message.instructions[0].data, "dead");
        assert_eq!(decoded.message.instructions[0].account_key_indexes, vec![0, 2, 3]);
        assert_eq!(
            decoded.message.address_lookup_table_accounts,
            vec![AddressTableLookup {
                account_key: table.to_string(),
                writable_indexes: vec![4],
                readonly_indexes: vec![7, 9],
            }]
        );

        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["version"], 0);
        assert!(json["message"]["addressLookupTableAccounts"].is_array());
    }

    #[test]
    fn legacy_version_serializes_as_string() {
        let (bytes, ..) = legacy_transfer();
        let tx = decode_solana_transaction(&encode_base58(&bytes)).unwrap().unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["version"], "legacy");
        assert_eq!(json["message"]["header"]["numRequiredSignatures"], 1);
    }

    #[test]
    fn garbage_is_generic_decode_error() {
        // Valid base-58 that is not a transaction.
        let err = decode_solana_transaction("3mJr7AoUXx2Wqd").unwrap_err();
        assert_eq!(err, ToolboxError::decode(SOLANA_DECODE_MESSAGE));
        // Neither base-58 nor base-64.
        let err = decode_solana_transaction("!!not-encoded!!").unwrap_err();
        assert_eq!(err, ToolboxError::decode(SOLANA_DECODE_MESSAGE));
    }

    #[test]
    fn empty_buffer_is_reported() {
        assert_eq!(
            decode_bytes(&[]).unwrap_err(),
            ToolboxError::decode("empty transaction buffer")
        );
    }
}
