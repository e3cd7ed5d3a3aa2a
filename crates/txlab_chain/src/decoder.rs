//! Per-family transaction decoding behind one capability trait.

use serde::Serialize;

use txlab_core::error::ToolboxError;

use crate::chain::ChainFamily;
use crate::evm::{EvmTransaction, decode_evm_transaction};
use crate::solana::{SolanaTransaction, decode_solana_transaction};

/// A decoded transaction of any supported family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedTransaction {
    Evm(EvmTransaction),
    Solana(SolanaTransaction),
}

impl DecodedTransaction {
    pub fn family(&self) -> ChainFamily {
        match self {
            Self::Evm(_) => ChainFamily::Evm,
            Self::Solana(_) => ChainFamily::Solana,
        }
    }
}

/// Decodes raw serialized transactions for one chain family.
pub trait TransactionDecoder: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// `Ok(None)` means the input was blank and nothing was attempted.
    fn decode(&self, input: &str) -> Result<Option<DecodedTransaction>, ToolboxError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EvmDecoder;

impl TransactionDecoder for EvmDecoder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn decode(&self, input: &str) -> Result<Option<DecodedTransaction>, ToolboxError> {
        Ok(decode_evm_transaction(input)?.map(DecodedTransaction::Evm))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SolanaDecoder;

impl TransactionDecoder for SolanaDecoder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    fn decode(&self, input: &str) -> Result<Option<DecodedTransaction>, ToolboxError> {
        Ok(decode_solana_transaction(input)?.map(DecodedTransaction::Solana))
    }
}

/// The decoder for `family`, if one exists.
pub fn decoder_for(family: ChainFamily) -> Option<&'static dyn TransactionDecoder> {
    match family {
        ChainFamily::Evm => Some(&EvmDecoder),
        ChainFamily::Solana => Some(&SolanaDecoder),
        ChainFamily::Tron | ChainFamily::Sui => None,
    }
}

/// Decode `input` with the decoder registered for `family`.
pub fn decode_transaction(
    family: ChainFamily,
    input: &str,
) -> Result<Option<DecodedTransaction>, ToolboxError> {
    let decoder = decoder_for(family).ok_or_else(|| {
        ToolboxError::validation(format!(
            "Transaction decoding is not supported for {}",
            family.label()
        ))
    })?;
    decoder.decode(input)
}
