// Chain registry, method catalogs, decoders and key tooling.

pub mod chain;
pub mod decoder;
pub mod evm;
pub mod rpc_methods;
pub mod solana;
pub mod wallet_generator;

// Re-export primary types for convenient access.
pub use chain::{
    ChainFamily, ChainSelection, NetworkConfig, NetworkId, RpcEndpoint, all_endpoints,
    all_networks, default_selection, find_network, networks, validate_endpoint_url,
};
pub use decoder::{DecodedTransaction, TransactionDecoder, decode_transaction, decoder_for};
pub use evm::{
    DecodedArg, DecodedCall, EvmTransaction, RecoveredSigner, SignatureInput,
    decode_function_data, decode_parameters, private_key_to_address, recover_signer,
};
pub use rpc_methods::{ParamField, RpcMethod, catalog, find_method, search_methods};
pub use solana::{MessageVersion, SolanaTransaction};
pub use wallet_generator::{GeneratedWallet, SelectedWord, generate_wallet};
