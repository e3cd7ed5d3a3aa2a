//! EVM tooling: transaction decoding, ABI decoding, signature recovery and
//! key conversion.

pub mod abi;
pub mod keys;
pub mod signature;
pub mod tx_decoder;

pub use abi::{DecodedArg, DecodedCall, decode_function_data, decode_parameters};
pub use keys::private_key_to_address;
pub use signature::{RecoveredSigner, Recovery, SignatureInput, recover_signer};
pub use tx_decoder::{AccessListEntry, AuthorizationEntry, EvmTransaction, decode_evm_transaction};
