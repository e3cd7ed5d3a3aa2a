use alloy_consensus::{SignableTransaction, Signed, Transaction, TxEip4844Variant, TxEnvelope};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{B256, Signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use txlab_core::codec::{bytes_to_hex, hex_to_bytes, is_hex, normalize_hex};
use txlab_core::error::{EVM_DECODE_MESSAGE, ToolboxError};

/// One entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub address: String,
    pub storage_keys: Vec<String>,
}

/// One signed EIP-7702 authorization tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationEntry {
    pub chain_id: String,
    pub address: String,
    pub nonce: String,
    pub y_parity: u8,
    pub r: String,
    pub s: String,
}

/// Display form of a signed EVM transaction.
///
/// Numeric fields are decimal strings so no value is narrowed on its way to
/// the presentation layer. `from` is recovered from the signature and is
/// absent when recovery fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmTransaction {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub to: Option<String>,
    pub from: Option<String>,
    pub value: String,
    pub data: String,
    pub gas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blob_versioned_hashes: Vec<String>,
    /// Number of blobs in the network-form sidecar; `None` when the payload
    /// carried no sidecar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_list: Vec<AuthorizationEntry>,
    pub nonce: String,
    pub chain_id: Option<String>,
    pub access_list: Vec<AccessListEntry>,
    pub r: String,
    pub s: String,
    pub v: String,
    pub y_parity: u8,
}

/// Decode a hex-encoded signed EVM transaction (legacy or any EIP-2718 type).
///
/// Blank input returns `Ok(None)` without attempting a decode.
pub fn decode_evm_transaction(input: &str) -> Result<Option<EvmTransaction>, ToolboxError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let normalized = normalize_hex(trimmed);
    if !is_hex(&normalized) {
        return Err(ToolboxError::validation(
            "Transaction must be a hex string (0-9, a-f)",
        ));
    }
    let bytes = hex_to_bytes(&normalized, "Transaction").map_err(|e| {
        warn!("EVM transaction hex is not byte-aligned: {e}");
        ToolboxError::decode(EVM_DECODE_MESSAGE)
    })?;
    if bytes.is_empty() {
        return Err(ToolboxError::decode(EVM_DECODE_MESSAGE));
    }

    let envelope = TxEnvelope::decode_2718_exact(&bytes).map_err(|e| {
        warn!("EVM envelope decode failed: {e}");
        ToolboxError::decode(EVM_DECODE_MESSAGE)
    })?;

    Ok(Some(describe_envelope(&envelope)))
}

fn describe_envelope(envelope: &TxEnvelope) -> EvmTransaction {
    let hash = *envelope.tx_hash();
    match envelope {
        TxEnvelope::Legacy(signed) => {
            let chain_id = signed.tx().chain_id;
            let mut out = describe(signed, "legacy", hash, signed.signature_hash());
            out.v = alloy_consensus::transaction::to_eip155_value(
                signed.signature().v(),
                chain_id,
            )
            .to_string();
            out
        }
        TxEnvelope::Eip2930(signed) => describe(signed, "eip2930", hash, signed.signature_hash()),
        TxEnvelope::Eip1559(signed) => describe(signed, "eip1559", hash, signed.signature_hash()),
        TxEnvelope::Eip4844(signed) => {
            // Sign over the bare transaction so the sidecar never leaks into
            // the signing payload.
            let signing_hash = signed.tx().tx().signature_hash();
            let mut out = describe(signed, "eip4844", hash, signing_hash);
            out.sidecar = match signed.tx() {
                TxEip4844Variant::TxEip4844(_) => None,
                TxEip4844Variant::TxEip4844WithSidecar(with) => Some(with.sidecar().blobs().len()),
            };
            out
        }
        TxEnvelope::Eip7702(signed) => describe(signed, "eip7702", hash, signed.signature_hash()),
    }
}

fn describe<T: Transaction>(
    signed: &Signed<T>,
    tx_type: &str,
    hash: B256,
    signing_hash: B256,
) -> EvmTransaction {
    let tx = signed.tx();
    let signature = signed.signature();

    let access_list = tx
        .access_list()
        .map(|list| {
            list.iter()
                .map(|item| AccessListEntry {
                    address: item.address.to_checksum(None),
                    storage_keys: item.storage_keys.iter().map(|k| k.to_string()).collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    let authorization_list = tx
        .authorization_list()
        .map(|list| {
            list.iter()
                .map(|auth| AuthorizationEntry {
                    chain_id: auth.inner().chain_id().to_string(),
                    address: auth.inner().address().to_checksum(None),
                    nonce: auth.inner().nonce().to_string(),
                    y_parity: auth.y_parity(),
                    r: B256::from(auth.r()).to_string(),
                    s: B256::from(auth.s()).to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = if tx.is_dynamic_fee() {
        (
            None,
            Some(tx.max_fee_per_gas().to_string()),
            tx.max_priority_fee_per_gas().map(|fee| fee.to_string()),
        )
    } else {
        (tx.gas_price().map(|price| price.to_string()), None, None)
    };

    let y_parity = u8::from(signature.v());

    EvmTransaction {
        hash: hash.to_string(),
        tx_type: tx_type.to_string(),
        to: tx.to().map(|addr| addr.to_checksum(None)),
        from: recover_sender(signature, &signing_hash),
        value: tx.value().to_string(),
        data: bytes_to_hex(tx.input()),
        gas: tx.gas_limit().to_string(),
        gas_price,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        max_fee_per_blob_gas: tx.max_fee_per_blob_gas().map(|fee| fee.to_string()),
        blob_versioned_hashes: tx
            .blob_versioned_hashes()
            .map(|hashes| hashes.iter().map(|h| h.to_string()).collect())
            .unwrap_or_default(),
        sidecar: None,
        authorization_list,
        nonce: tx.nonce().to_string(),
        chain_id: tx.chain_id().map(|id| id.to_string()),
        access_list,
        r: B256::from(signature.r()).to_string(),
        s: B256::from(signature.s()).to_string(),
        v: (27 + u64::from(y_parity)).to_string(),
        y_parity,
    }
}

/// Recovery failure degrades to an absent sender rather than failing the
/// whole decode.
fn recover_sender(signature: &Signature, signing_hash: &B256) -> Option<String> {
    match signature.recover_address_from_prehash(signing_hash) {
        Ok(address) => {
            debug!(from = %address, "Recovered transaction sender");
            Some(address.to_checksum(None))
        }
        Err(e) => {
            warn!("Failed to recover transaction sender: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::{TxEip1559, TxEip2930, TxEip4844, TxEip4844WithSidecar, TxEip7702, TxLegacy};
    use alloy_eips::eip2718::Encodable2718;
    use alloy_eips::eip2930::{AccessList, AccessListItem};
    use alloy_eips::eip4844::{Blob, BlobTransactionSidecar, Bytes48};
    use alloy_eips::eip7594::BlobTransactionSidecarVariant;
    use alloy_eips::eip7702::{Authorization, SignedAuthorization};
    use alloy_primitives::{Address, Bytes, TxKind, U256, address, b256};
    use k256::ecdsa::SigningKey;

    // EIP-155 reference transaction, signed with key 0x4646..46.
    const EIP155_TX: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";

    fn test_key() -> SigningKey {
        SigningKey::from_slice(&[0x46; 32]).unwrap()
    }

    fn sign<T: SignableTransaction<Signature>>(tx: T, key: &SigningKey) -> Signed<T> {
        let hash = tx.signature_hash();
        let (sig, recid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
        tx.into_signed(Signature::from_signature_and_parity(sig, recid.is_y_odd()))
    }

    fn encode(envelope: TxEnvelope) -> String {
        format!("0x{}", hex::encode(envelope.encoded_2718()))
    }

    #[test]
    fn blank_input_is_a_no_op() {
        assert_eq!(decode_evm_transaction("").unwrap(), None);
        assert_eq!(decode_evm_transaction("   \n").unwrap(), None);
    }

    #[test]
    fn non_hex_input_is_validation_error() {
        let err = decode_evm_transaction("0xzz12").unwrap_err();
        assert!(matches!(err, ToolboxError::Validation(_)));
    }

    #[test]
    fn corrupt_envelope_is_generic_decode_error() {
        let err = decode_evm_transaction("0x02deadbeef").unwrap_err();
        assert_eq!(err, ToolboxError::decode(EVM_DECODE_MESSAGE));
    }

    #[test]
    fn odd_length_hex_is_generic_decode_error() {
        for input in ["0xf86", "f86c0"] {
            assert_eq!(
                decode_evm_transaction(input).unwrap_err(),
                ToolboxError::decode(EVM_DECODE_MESSAGE)
            );
        }
    }

    #[test]
    fn decodes_eip155_reference_transaction() {
        let tx = decode_evm_transaction(EIP155_TX).unwrap().unwrap();
        assert_eq!(tx.tx_type, "legacy");
        assert_eq!(tx.nonce, "9");
        assert_eq!(tx.gas_price.as_deref(), Some("20000000000"));
        assert_eq!(tx.gas, "21000");
        assert_eq!(
            tx.to.as_deref(),
            Some("0x3535353535353535353535353535353535353535")
        );
        assert_eq!(tx.value, "1000000000000000000");
        assert_eq!(tx.data, "0x");
        assert_eq!(tx.chain_id.as_deref(), Some("1"));
        assert_eq!(tx.v, "37");
        assert_eq!(
            tx.from.as_deref(),
            Some("0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F")
        );
        assert!(tx.max_fee_per_gas.is_none());
        assert!(tx.access_list.is_empty());
    }

    #[test]
    fn missing_prefix_and_uppercase_are_accepted() {
        let bare = EIP155_TX.trim_start_matches("0x").to_uppercase();
        let tx = decode_evm_transaction(&bare).unwrap().unwrap();
        assert_eq!(tx.nonce, "9");
    }

    #[test]
    fn eip1559_round_trip_recovers_sender() {
        let key = test_key();
        let tx = TxEip1559 {
            chain_id: 8453,
            nonce: 42,
            gas_limit: 90_000,
            max_fee_per_gas: 3_000_000_000,
            max_priority_fee_per_gas: 1_500_000_000,
            to: TxKind::Call(address!("0x000000000000000000000000000000000000dead")),
            value: U256::from(123_456_789u64),
            access_list: AccessList(vec![AccessListItem {
                address: address!("0x000000000000000000000000000000000000beef"),
                storage_keys: vec![b256!(
                    "0x0000000000000000000000000000000000000000000000000000000000000001"
                )],
            }]),
            input: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        };
        let signed = sign(tx, &key);
        let expected_hash = signed.hash().to_string();
        let raw = encode(TxEnvelope::from(signed));

        let decoded = decode_evm_transaction(&raw).unwrap().unwrap();
        assert_eq!(decoded.tx_type, "eip1559");
        assert_eq!(decoded.hash, expected_hash);
        assert_eq!(decoded.chain_id.as_deref(), Some("8453"));
        assert_eq!(decoded.nonce, "42");
        assert_eq!(decoded.gas, "90000");
        assert_eq!(decoded.max_fee_per_gas.as_deref(), Some("3000000000"));
        assert_eq!(decoded.max_priority_fee_per_gas.as_deref(), Some("1500000000"));
        assert!(decoded.gas_price.is_none());
        assert_eq!(decoded.value, "123456789");
        assert_eq!(decoded.data, "0xa9059cbb");
        assert_eq!(
            decoded.to.as_deref(),
            Some("0x000000000000000000000000000000000000dEaD")
        );
        assert_eq!(decoded.access_list.len(), 1);
        assert_eq!(
            decoded.access_list[0].address,
            address!("0x000000000000000000000000000000000000beef").to_checksum(None)
        );
        assert_eq!(decoded.access_list[0].storage_keys.len(), 1);
        assert_eq!(
            decoded.from,
            Some(Address::from_private_key(&key).to_checksum(None))
        );
        assert!(decoded.v == "27" || decoded.v == "28");
        assert_eq!(decoded.v, (27 + u64::from(decoded.y_parity)).to_string());
    }

    #[test]
    fn eip2930_contract_creation_has_no_recipient() {
        let key = test_key();
        let tx = TxEip2930 {
            chain_id: 1,
            nonce: 0,
            gas_price: 7,
            gas_limit: 500_000,
            to: TxKind::Create,
            value: U256::ZERO,
            access_list: AccessList::default(),
            input: Bytes::from(vec![0x60, 0x80]),
        };
        let raw = encode(TxEnvelope::from(sign(tx, &key)));

        let decoded = decode_evm_transaction(&raw).unwrap().unwrap();
        assert_eq!(decoded.tx_type, "eip2930");
        assert!(decoded.to.is_none());
        assert_eq!(decoded.gas_price.as_deref(), Some("7"));
        assert!(decoded.access_list.is_empty());
        assert!(decoded.from.is_some());
    }

    #[test]
    fn legacy_without_chain_id_uses_pre_eip155_v() {
        let key = test_key();
        let tx = TxLegacy {
            chain_id: None,
            nonce: 1,
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::from(1u8),
            input: Bytes::new(),
        };
        let raw = encode(TxEnvelope::from(sign(tx, &key)));

        let decoded = decode_evm_transaction(&raw).unwrap().unwrap();
        assert!(decoded.chain_id.is_none());
        assert!(decoded.v == "27" || decoded.v == "28");
    }

    #[test]
    fn eip4844_network_form_reports_sidecar() {
        let key = test_key();
        let sidecar = BlobTransactionSidecar {
            blobs: vec![Blob::ZERO],
            commitments: vec![Bytes48::ZERO],
            proofs: vec![Bytes48::ZERO],
        };
        let tx = TxEip4844 {
            chain_id: 1,
            nonce: 3,
            gas_limit: 21_000,
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: address!("0x000000000000000000000000000000000000dead"),
            max_fee_per_blob_gas: 7,
            blob_versioned_hashes: sidecar.versioned_hashes().collect(),
            ..Default::default()
        };
        let expected_hashes: Vec<String> =
            tx.blob_versioned_hashes.iter().map(|h| h.to_string()).collect();
        let signer = Some(Address::from_private_key(&key).to_checksum(None));

        let bare = sign(TxEip4844Variant::<BlobTransactionSidecarVariant>::TxEip4844(tx.clone()), &key);
        let decoded = decode_evm_transaction(&encode(TxEnvelope::from(bare)))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.tx_type, "eip4844");
        assert_eq!(decoded.sidecar, None);
        assert_eq!(decoded.from, signer);

        let with_sidecar = TxEip4844Variant::TxEip4844WithSidecar(
            TxEip4844WithSidecar::from_tx_and_sidecar(
                tx,
                BlobTransactionSidecarVariant::Eip4844(sidecar),
            ),
        );
        let signed = sign(with_sidecar, &key);
        let expected_hash = signed.hash().to_string();
        let decoded = decode_evm_transaction(&encode(TxEnvelope::from(signed)))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.tx_type, "eip4844");
        assert_eq!(decoded.sidecar, Some(1));
        // The sidecar is not part of the hash or the signing payload.
        assert_eq!(decoded.hash, expected_hash);
        assert_eq!(decoded.from, signer);
        assert_eq!(decoded.max_fee_per_blob_gas.as_deref(), Some("7"));
        assert_eq!(decoded.blob_versioned_hashes, expected_hashes);
        assert!(decoded.gas_price.is_none());
    }

    #[test]
    fn eip7702_lists_authorizations() {
        let key = test_key();
        let delegate = address!("0x000000000000000000000000000000000000beef");
        let authorization = SignedAuthorization::new_unchecked(
            Authorization {
                chain_id: U256::from(1u8),
                address: delegate,
                nonce: 5,
            },
            1,
            U256::from(11u8),
            U256::from(22u8),
        );
        let tx = TxEip7702 {
            chain_id: 1,
            nonce: 9,
            gas_limit: 100_000,
            max_fee_per_gas: 3,
            max_priority_fee_per_gas: 2,
            to: address!("0x000000000000000000000000000000000000dead"),
            authorization_list: vec![authorization],
            ..Default::default()
        };
        let raw = encode(TxEnvelope::from(sign(tx, &key)));

        let decoded = decode_evm_transaction(&raw).unwrap().unwrap();
        assert_eq!(decoded.tx_type, "eip7702");
        assert_eq!(decoded.max_fee_per_gas.as_deref(), Some("3"));
        assert_eq!(
            decoded.from,
            Some(Address::from_private_key(&key).to_checksum(None))
        );
        assert_eq!(
            decoded.authorization_list,
            vec![AuthorizationEntry {
                chain_id: "1".into(),
                address: delegate.to_checksum(None),
                nonce: "5".into(),
                y_parity: 1,
                r: B256::from(U256::from(11u8)).to_string(),
                s: B256::from(U256::from(22u8)).to_string(),
            }]
        );

        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["authorizationList"][0]["yParity"], 1);
        assert_eq!(json["authorizationList"][0]["nonce"], "5");
    }

    #[test]
    fn invalid_signature_leaves_sender_empty() {
        let tx = TxEip1559 {
            chain_id: 1,
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas: 1,
            max_priority_fee_per_gas: 1,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            access_list: AccessList::default(),
            input: Bytes::new(),
        };
        // r = 0 is never a valid ECDSA scalar.
        let bogus = Signature::new(U256::ZERO, U256::from(1u8), false);
        let raw = encode(TxEnvelope::from(tx.into_signed(bogus)));

        let decoded = decode_evm_transaction(&raw).unwrap().unwrap();
        assert!(decoded.from.is_none());
        assert_eq!(decoded.nonce, "0");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let tx = decode_evm_transaction(EIP155_TX).unwrap().unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "legacy");
        assert_eq!(json["gasPrice"], "20000000000");
        assert_eq!(json["chainId"], "1");
        assert!(json.get("maxFeePerGas").is_none());
        assert!(json.get("authorizationList").is_none());
    }
}
