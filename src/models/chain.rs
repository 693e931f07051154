use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol dialect of a chain. Decides RPC method naming and address format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Starknet,
    Solana,
    Cosmos,
    Substrate,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Starknet => "starknet",
            ChainFamily::Solana => "solana",
            ChainFamily::Cosmos => "cosmos",
            ChainFamily::Substrate => "substrate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "evm" => Some(ChainFamily::Evm),
            "starknet" => Some(ChainFamily::Starknet),
            "solana" => Some(ChainFamily::Solana),
            "cosmos" => Some(ChainFamily::Cosmos),
            "substrate" => Some(ChainFamily::Substrate),
            _ => None,
        }
    }

    pub fn all() -> [ChainFamily; 5] {
        [
            ChainFamily::Evm,
            ChainFamily::Starknet,
            ChainFamily::Solana,
            ChainFamily::Cosmos,
            ChainFamily::Substrate,
        ]
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: String,
    pub name: String,
    /// Tried in order by the fan-out client.
    pub rpcs: Vec<String>,
    pub family: ChainFamily,
    pub native_currency: String,
    pub explorer: String,
}

impl ChainConfig {
    pub fn new(
        id: &str,
        name: &str,
        rpcs: &[&str],
        family: ChainFamily,
        native_currency: &str,
        explorer: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rpcs: rpcs.iter().map(|r| r.to_string()).collect(),
            family,
            native_currency: native_currency.to_string(),
            explorer: explorer.to_string(),
        }
    }
}

pub const DEFAULT_CHAIN_ID: &str = "starknet";

/// Built-in chain registry.
pub fn supported_chains() -> Vec<ChainConfig> {
    use ChainFamily::*;

    vec![
        ChainConfig::new(
            "starknet",
            "Starknet",
            &[
                "https://starknet-mainnet.public.blastapi.io",
                "https://free-rpc.nethermind.io/mainnet-juno",
                "https://starknet-mainnet.reddio.com/rpc/v0_7",
                "https://rpc.starknet.lava.build",
            ],
            Starknet,
            "ETH",
            "https://starkscan.co",
        ),
        ChainConfig::new(
            "avalanche",
            "Avalanche",
            &["https://api.avax.network/ext/bc/C/rpc"],
            Evm,
            "AVAX",
            "https://snowtrace.io",
        ),
        ChainConfig::new(
            "okxchain",
            "OKX Chain",
            &["https://exchainrpc.okex.org"],
            Evm,
            "OKT",
            "https://www.oklink.com/okexchain",
        ),
        ChainConfig::new(
            "bnb",
            "BNB Smart Chain",
            &["https://bsc-dataseed.bnbchain.org", "https://bsc.publicnode.com"],
            Evm,
            "BNB",
            "https://bscscan.com",
        ),
        ChainConfig::new(
            "mantle",
            "Mantle",
            &["https://rpc.mantle.xyz"],
            Evm,
            "MNT",
            "https://explorer.mantle.xyz",
        ),
        ChainConfig::new(
            "cronos",
            "Cronos",
            &["https://evm.cronos.org", "https://cronos-evm.publicnode.com"],
            Evm,
            "CRO",
            "https://cronoscan.com",
        ),
        ChainConfig::new(
            "ethereum",
            "Ethereum",
            &[
                "https://rpc.flashbots.net",
                "https://eth.drpc.org",
                "https://eth-pokt.nodies.app",
            ],
            Evm,
            "ETH",
            "https://etherscan.io",
        ),
        ChainConfig::new(
            "base",
            "Base",
            &["https://mainnet.base.org", "https://base-rpc.publicnode.com"],
            Evm,
            "ETH",
            "https://basescan.org",
        ),
        ChainConfig::new(
            "polygon",
            "Polygon",
            &["https://polygon-bor-rpc.publicnode.com", "https://polygon-rpc.com"],
            Evm,
            "MATIC",
            "https://polygonscan.com",
        ),
        ChainConfig::new(
            "arbitrum",
            "Arbitrum",
            &["https://arbitrum-one.publicnode.com", "https://arb1.arbitrum.io/rpc"],
            Evm,
            "ETH",
            "https://arbiscan.io",
        ),
        ChainConfig::new(
            "zora",
            "Zora",
            &["https://rpc.zora.energy"],
            Evm,
            "ETH",
            "https://explorer.zora.energy",
        ),
        ChainConfig::new(
            "linea",
            "Linea",
            &["https://rpc.linea.build", "https://linea-rpc.publicnode.com"],
            Evm,
            "ETH",
            "https://lineascan.build",
        ),
        ChainConfig::new(
            "aurora",
            "Aurora",
            &["https://mainnet.aurora.dev"],
            Evm,
            "ETH",
            "https://aurorascan.dev",
        ),
        ChainConfig::new(
            "moonbeam",
            "Moonbeam",
            &["https://rpc.api.moonbeam.network"],
            Evm,
            "GLMR",
            "https://moonscan.io",
        ),
        ChainConfig::new(
            "moonriver",
            "Moonriver",
            &["https://rpc.api.moonriver.moonbeam.network"],
            Evm,
            "MOVR",
            "https://moonriver.moonscan.io",
        ),
        ChainConfig::new(
            "optimism",
            "Optimism",
            &["https://mainnet.optimism.io", "https://optimism-rpc.publicnode.com"],
            Evm,
            "ETH",
            "https://optimistic.etherscan.io",
        ),
        ChainConfig::new(
            "zksync",
            "zkSync Era",
            &["https://mainnet.era.zksync.io"],
            Evm,
            "ETH",
            "https://explorer.zksync.io",
        ),
        ChainConfig::new(
            "scroll",
            "Scroll",
            &["https://scroll.publicnode.dev"],
            Evm,
            "ETH",
            "https://scrollscan.com",
        ),
        ChainConfig::new(
            "blast",
            "Blast",
            &["https://blast.publicnode.dev"],
            Evm,
            "ETH",
            "https://blastscan.io",
        ),
        ChainConfig::new(
            "solana",
            "Solana",
            &["https://solana.publicnode.dev"],
            Solana,
            "SOL",
            "https://solscan.io",
        ),
    ]
}

/// Ordered set of known chains. Insertion order is preserved so the first
/// entry acts as the fallback for unknown ids.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(supported_chains())
    }
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &[ChainConfig] {
        &self.chains
    }

    pub fn get(&self, id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Looks up `id`, falling back to the first registered chain.
    pub fn resolve(&self, id: &str) -> Option<&ChainConfig> {
        self.get(id).or_else(|| self.chains.first())
    }

    pub fn default_chain(&self) -> Option<&ChainConfig> {
        self.resolve(DEFAULT_CHAIN_ID)
    }

    /// Adds a chain, replacing any existing entry with the same id in place.
    pub fn upsert(&mut self, chain: ChainConfig) {
        match self.chains.iter_mut().find(|c| c.id == chain.id) {
            Some(existing) => *existing = chain,
            None => self.chains.push(chain),
        }
    }

    /// Replaces the RPC list of a known chain. Returns false if the id is unknown.
    pub fn set_rpcs(&mut self, id: &str, rpcs: Vec<String>) -> bool {
        match self.chains.iter_mut().find(|c| c.id == id) {
            Some(chain) => {
                chain.rpcs = rpcs;
                true
            }
            None => false,
        }
    }

    pub fn by_family(&self, family: ChainFamily) -> Vec<&ChainConfig> {
        self.chains.iter().filter(|c| c.family == family).collect()
    }
}
