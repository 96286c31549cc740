use std::collections::HashMap;

use alloy::primitives::address;

use super::token::TokenConfig;

/// Network the tracker knows how to read balances from
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub block_explorer: String,
    pub native: TokenConfig,
    pub tokens: Vec<TokenConfig>,
}

impl ChainConfig {
    /// Native asset first, then the configured contract tokens
    pub fn all_tokens(&self) -> Vec<TokenConfig> {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.push(self.native.clone());
        tokens.extend(self.tokens.iter().cloned());
        tokens
    }

    /// Price identifiers of every asset on this chain
    pub fn price_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for token in self.all_tokens() {
            if !ids.contains(&token.price_id) {
                ids.push(token.price_id);
            }
        }
        ids
    }
}

/// Supported networks, keyed by chain id
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (c.chain_id, c)).collect(),
        }
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Replace the RPC endpoint of a known chain
    pub fn set_rpc_url(&mut self, chain_id: u64, rpc_url: String) {
        if let Some(chain) = self.chains.get_mut(&chain_id) {
            chain.rpc_url = rpc_url;
        }
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        let mainnet = ChainConfig {
            chain_id: 1,
            name: "Ethereum Mainnet".to_string(),
            rpc_url: "https://cloudflare-eth.com".to_string(),
            block_explorer: "https://etherscan.io".to_string(),
            native: TokenConfig::native("ETH", "Ethereum", "ethereum"),
            tokens: vec![
                TokenConfig::new(
                    "USDC",
                    "USD Coin",
                    address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                    6,
                    "usd-coin",
                ),
                TokenConfig::new(
                    "USDT",
                    "Tether",
                    address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
                    6,
                    "tether",
                ),
                TokenConfig::new(
                    "WBTC",
                    "Wrapped Bitcoin",
                    address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
                    8,
                    "wrapped-bitcoin",
                ),
            ],
        };

        let polygon = ChainConfig {
            chain_id: 137,
            name: "Polygon".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            block_explorer: "https://polygonscan.com".to_string(),
            native: TokenConfig::native("MATIC", "Polygon", "matic-network"),
            tokens: vec![
                TokenConfig::new(
                    "USDC",
                    "USD Coin",
                    address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
                    6,
                    "usd-coin",
                ),
                TokenConfig::new(
                    "USDT",
                    "Tether",
                    address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"),
                    6,
                    "tether",
                ),
            ],
        };

        Self::new(vec![mainnet, polygon])
    }
}
