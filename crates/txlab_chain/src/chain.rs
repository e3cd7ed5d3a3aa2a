//! Chain families, network identifiers and the compiled-in endpoint registry.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use txlab_core::ToolboxError;

/// Supported chain families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
    Tron,
    Sui,
}

impl ChainFamily {
    pub const ALL: [ChainFamily; 4] = [Self::Evm, Self::Solana, Self::Tron, Self::Sui];

    /// Human-readable label for the family.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::Solana => "Solana",
            Self::Tron => "Tron",
            Self::Sui => "Sui",
        }
    }

    /// Short lowercase tag used in selection strings (`evm:1`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Tron => "tron",
            Self::Sui => "sui",
        }
    }

    /// Lightweight JSON-RPC method used to measure endpoint latency.
    pub fn probe_method(&self) -> &'static str {
        match self {
            Self::Evm | Self::Tron => "eth_blockNumber",
            Self::Solana => "getSlot",
            Self::Sui => "sui_getChainIdentifier",
        }
    }

    /// Storage key of the family's call-history log.
    pub fn history_storage_key(&self) -> &'static str {
        match self {
            Self::Evm => txlab_core::storage::KEY_CALL_HISTORY,
            Self::Tron => "tron_rpc_call_history",
            Self::Solana => "solana-rpc-caller-call-history",
            Self::Sui => "sui-rpc-caller-call-history",
        }
    }

    /// Whether a raw-transaction decoder exists for this family.
    pub fn supports_tx_decoding(&self) -> bool {
        matches!(self, Self::Evm | Self::Solana)
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ChainFamily {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" | "eth" | "ethereum" => Ok(Self::Evm),
            "solana" | "sol" => Ok(Self::Solana),
            "tron" | "trx" => Ok(Self::Tron),
            "sui" => Ok(Self::Sui),
            other => Err(ToolboxError::validation(format!(
                "Unknown chain family: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Network identifiers
// ---------------------------------------------------------------------------

/// Numeric chain id for EVM chains, network tag for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkId {
    Chain(u64),
    Named(String),
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain(id) => write!(f, "{id}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self::Chain(id)
    }
}

impl From<&str> for NetworkId {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// A family plus a network within it. Displays as `family:network`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainSelection {
    pub family: ChainFamily,
    pub network: NetworkId,
}

impl ChainSelection {
    pub fn new(family: ChainFamily, network: impl Into<NetworkId>) -> Self {
        Self {
            family,
            network: network.into(),
        }
    }

    pub fn evm(chain_id: u64) -> Self {
        Self::new(ChainFamily::Evm, NetworkId::Chain(chain_id))
    }
}

impl fmt::Display for ChainSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.network)
    }
}

impl FromStr for ChainSelection {
    type Err = ToolboxError;

    /// Parses `evm:1`, `evm:base`, `solana:devnet` or a bare family name
    /// (which resolves to that family's default network).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((family, network)) = s.split_once(':') else {
            return Ok(default_selection(s.parse()?));
        };
        let family: ChainFamily = family.parse()?;
        let network = network.trim();
        if network.is_empty() {
            return Err(ToolboxError::validation(format!(
                "Missing network in chain selection: {s}"
            )));
        }
        let network = match family {
            ChainFamily::Evm => match network.parse::<u64>() {
                Ok(id) => NetworkId::Chain(id),
                Err(_) => evm_chain_by_short_name(network)
                    .map(|c| c.id.clone())
                    .ok_or_else(|| {
                        ToolboxError::validation(format!("Unknown EVM chain: {network}"))
                    })?,
            },
            _ => NetworkId::Named(network.to_string()),
        };
        Ok(Self { family, network })
    }
}

// ---------------------------------------------------------------------------
// Endpoints and network configs
// ---------------------------------------------------------------------------

/// A JSON-RPC endpoint, either compiled in or added by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEndpoint {
    pub url: String,
    pub name: String,
    #[serde(rename = "chainId")]
    pub network: NetworkId,
    pub is_public: bool,
}

impl RpcEndpoint {
    fn public(url: &str, name: &str, network: &NetworkId) -> Self {
        Self {
            url: url.to_string(),
            name: name.to_string(),
            network: network.clone(),
            is_public: true,
        }
    }

    pub fn custom(url: impl Into<String>, name: impl Into<String>, network: NetworkId) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            network,
            is_public: false,
        }
    }
}

/// Static description of one chain or network.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub family: ChainFamily,
    pub id: NetworkId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    pub public_endpoints: Vec<RpcEndpoint>,
}

impl NetworkConfig {
    pub fn selection(&self) -> ChainSelection {
        ChainSelection::new(self.family, self.id.clone())
    }
}

fn network(
    family: ChainFamily,
    id: NetworkId,
    name: &str,
    short_name: Option<&str>,
    endpoints: &[(&str, &str)],
) -> NetworkConfig {
    let public_endpoints = endpoints
        .iter()
        .map(|(url, label)| RpcEndpoint::public(url, label, &id))
        .collect();
    NetworkConfig {
        family,
        id,
        name: name.to_string(),
        short_name: short_name.map(str::to_string),
        public_endpoints,
    }
}

fn evm(chain_id: u64, name: &str, short_name: &str, endpoints: &[(&str, &str)]) -> NetworkConfig {
    network(
        ChainFamily::Evm,
        NetworkId::Chain(chain_id),
        name,
        Some(short_name),
        endpoints,
    )
}

fn named(family: ChainFamily, tag: &str, name: &str, endpoints: &[(&str, &str)]) -> NetworkConfig {
    network(family, NetworkId::Named(tag.to_string()), name, None, endpoints)
}

static REGISTRY: Lazy<Vec<NetworkConfig>> = Lazy::new(|| {
    use ChainFamily::{Solana, Sui, Tron};

    vec![
        // -- EVM ------------------------------------------------------------
        evm(1, "Ethereum Mainnet", "eth", &[
            ("https://eth.llamarpc.com", "LlamaRPC"),
            ("https://rpc.ankr.com/eth", "Ankr"),
            ("https://ethereum.publicnode.com", "PublicNode"),
            ("https://eth.merkle.io", "Merkle"),
            ("https://rpc.flashbots.net", "Flashbots"),
        ]),
        evm(56, "BNB Smart Chain", "bnb", &[
            ("https://bsc-dataseed.binance.org", "Binance"),
            ("https://bsc-dataseed1.defibit.io", "DefiBit"),
            ("https://bsc-dataseed1.ninicoin.io", "Ninicoin"),
            ("https://bsc-dataseed2.defibit.io", "DefiBit 2"),
            ("https://bsc-dataseed3.defibit.io", "DefiBit 3"),
        ]),
        evm(137, "Polygon", "matic", &[
            ("https://polygon-rpc.com", "Polygon RPC"),
            ("https://rpc.ankr.com/polygon", "Ankr"),
            ("https://polygon.llamarpc.com", "LlamaRPC"),
            ("https://polygon.blockpi.network/v1/rpc/public", "BlockPI"),
            ("https://polygon-bor.publicnode.com", "PublicNode"),
        ]),
        evm(8453, "Base", "base", &[
            ("https://mainnet.base.org", "Base Official"),
            ("https://base.llamarpc.com", "LlamaRPC"),
            ("https://base-rpc.publicnode.com", "PublicNode"),
            ("https://base.gateway.tenderly.co", "Tenderly"),
            ("https://1rpc.io/base", "1RPC"),
        ]),
        evm(42161, "Arbitrum One", "arbitrum", &[
            ("https://arb1.arbitrum.io/rpc", "Arbitrum Official"),
            ("https://arbitrum.llamarpc.com", "LlamaRPC"),
            ("https://arbitrum-one-rpc.publicnode.com", "PublicNode"),
            ("https://rpc.ankr.com/arbitrum", "Ankr"),
            ("https://arbitrum.blockpi.network/v1/rpc/public", "BlockPI"),
        ]),
        evm(2819, "Morph", "morph", &[
            ("https://rpc.morphl2.io", "Morph Official"),
            ("https://rpc-quicknode.morphl2.io", "QuickNode"),
        ]),
        // -- Solana ---------------------------------------------------------
        named(Solana, "mainnet-beta", "Solana Mainnet", &[
            ("https://api.mainnet-beta.solana.com", "Solana Official"),
            ("https://solana-api.projectserum.com", "Project Serum"),
            ("https://rpc.ankr.com/solana", "Ankr"),
            ("https://solana.public-rpc.com", "Public RPC"),
        ]),
        named(Solana, "testnet", "Solana Testnet", &[
            ("https://api.testnet.solana.com", "Solana Official"),
        ]),
        named(Solana, "devnet", "Solana Devnet", &[
            ("https://api.devnet.solana.com", "Solana Official"),
        ]),
        // -- Tron -----------------------------------------------------------
        named(Tron, "mainnet", "Tron Mainnet", &[
            ("https://api.trongrid.io", "TronGrid Official"),
            ("https://api.tronstack.io", "TronStack"),
            ("https://tron.blockpi.network/v1/rpc/public", "BlockPI"),
            ("https://rpc.ankr.com/tron", "Ankr"),
        ]),
        named(Tron, "shasta", "Tron Shasta Testnet", &[
            ("https://api.shasta.trongrid.io", "TronGrid Shasta"),
        ]),
        named(Tron, "nile", "Tron Nile Testnet", &[
            ("https://api.nileex.io", "Nile Testnet"),
        ]),
        // -- Sui ------------------------------------------------------------
        named(Sui, "mainnet", "Sui Mainnet", &[
            ("https://fullnode.mainnet.sui.io:443", "Sui Official Mainnet"),
            ("https://sui-mainnet-endpoint.blockvision.org", "BlockVision"),
            ("https://sui-mainnet-rpc.bartestnet.com", "BarTestnet"),
        ]),
        named(Sui, "testnet", "Sui Testnet", &[
            ("https://fullnode.testnet.sui.io:443", "Sui Official Testnet"),
        ]),
        named(Sui, "devnet", "Sui Devnet", &[
            ("https://fullnode.devnet.sui.io:443", "Sui Official Devnet"),
        ]),
    ]
});

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Every compiled-in network, in registry order.
pub fn all_networks() -> &'static [NetworkConfig] {
    &REGISTRY
}

/// Networks of one family, in registry order.
pub fn networks(family: ChainFamily) -> impl Iterator<Item = &'static NetworkConfig> {
    REGISTRY.iter().filter(move |n| n.family == family)
}

pub fn find_network(selection: &ChainSelection) -> Option<&'static NetworkConfig> {
    REGISTRY
        .iter()
        .find(|n| n.family == selection.family && n.id == selection.network)
}

pub fn evm_chain(chain_id: u64) -> Option<&'static NetworkConfig> {
    find_network(&ChainSelection::evm(chain_id))
}

pub fn evm_chain_by_short_name(short_name: &str) -> Option<&'static NetworkConfig> {
    networks(ChainFamily::Evm).find(|n| n.short_name.as_deref() == Some(short_name))
}

/// First network of the family (Ethereum mainnet, Solana mainnet-beta, ...).
pub fn default_selection(family: ChainFamily) -> ChainSelection {
    networks(family)
        .next()
        .map(NetworkConfig::selection)
        .unwrap_or_else(|| ChainSelection::new(family, NetworkId::Named("mainnet".into())))
}

/// Public endpoints followed by `custom`. For an unknown selection only the
/// custom endpoints are returned.
pub fn all_endpoints(selection: &ChainSelection, custom: &[RpcEndpoint]) -> Vec<RpcEndpoint> {
    match find_network(selection) {
        Some(config) => config
            .public_endpoints
            .iter()
            .chain(custom.iter())
            .cloned()
            .collect(),
        None => custom.to_vec(),
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_endpoint_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
