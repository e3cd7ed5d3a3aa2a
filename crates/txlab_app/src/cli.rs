use clap::{Parser, Subcommand};

use txlab_chain::{ChainFamily, ChainSelection};

#[derive(Parser, Debug)]
#[command(name = "txlab", version, about = "Multi-chain transaction and JSON-RPC toolbox")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a raw signed EVM transaction (hex).
    DecodeEvm { hex: String },

    /// Decode a serialized Solana transaction (base-58 or base-64).
    DecodeSolana { encoded: String },

    /// Decode ABI-encoded call data or parameters.
    Abi {
        #[command(subcommand)]
        command: AbiCommand,
    },

    /// Recover the signer of a 32-byte message hash.
    Recover {
        #[arg(long)]
        hash: String,
        /// 65-byte r||s||v or 64-byte r||s hex.
        #[arg(long, conflicts_with_all = ["r", "s", "v"], required_unless_present_all = ["r", "s"])]
        signature: Option<String>,
        #[arg(long, requires = "s")]
        r: Option<String>,
        #[arg(long, requires = "r")]
        s: Option<String>,
        /// 27 or 28. Both are tried when omitted.
        #[arg(long)]
        v: Option<String>,
    },

    /// Derive the EVM address of a private key.
    KeyToAddress { key: String },

    /// Generate the deterministic wallet for a character sequence.
    Wallet {
        chars: String,
        #[arg(long)]
        salt: Option<String>,
    },

    /// List compiled-in networks and their public endpoints.
    Networks {
        #[arg(long)]
        family: Option<ChainFamily>,
    },

    /// Browse the RPC method catalog of a family.
    Methods {
        #[arg(long)]
        family: ChainFamily,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// Print only the category names.
        #[arg(long, conflicts_with_all = ["category", "search"])]
        categories: bool,
    },

    /// Probe every endpoint of a chain and select the fastest.
    Probe {
        /// `evm:1`, `evm:base`, `solana:devnet`, or a bare family name.
        #[arg(long)]
        chain: Option<ChainSelection>,
    },

    /// Send a JSON-RPC call.
    Call {
        #[arg(long)]
        chain: Option<ChainSelection>,
        /// Endpoint URL. Defaults to the selected or fastest endpoint.
        #[arg(long)]
        endpoint: Option<String>,
        method: String,
        /// JSON array. Defaults to the catalog's pre-filled parameters.
        params: Option<String>,
    },

    /// Print the cURL command for a JSON-RPC call.
    Curl {
        endpoint: String,
        method: String,
        params: Option<String>,
    },

    /// Show or edit the call history.
    History {
        #[arg(long)]
        family: Option<ChainFamily>,
        #[arg(long, conflicts_with = "clear")]
        delete: Option<String>,
        #[arg(long)]
        clear: bool,
    },

    /// Manage custom endpoints.
    Endpoints {
        #[command(subcommand)]
        command: EndpointsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AbiCommand {
    /// Decode call data against an ABI (JSON, human-readable, or @file).
    Function {
        #[arg(long)]
        abi: String,
        #[arg(long)]
        data: String,
    },
    /// Decode raw parameters against a type list.
    Params {
        #[arg(long)]
        types: String,
        #[arg(long)]
        data: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EndpointsCommand {
    List {
        #[arg(long)]
        chain: Option<ChainSelection>,
    },
    Add {
        #[arg(long)]
        chain: Option<ChainSelection>,
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    Remove {
        #[arg(long)]
        chain: Option<ChainSelection>,
        url: String,
    },
}
