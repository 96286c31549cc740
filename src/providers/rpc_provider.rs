use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::models::{ChainConfig, TokenConfig};
use crate::traits::data_provider::BalanceProvider;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Build a read-only HTTP provider for `url`
pub fn http_provider(url: &str) -> anyhow::Result<RootProvider<Ethereum>> {
    let url: Url = url.parse().with_context(|| format!("Invalid RPC url {}", url))?;
    Ok(RootProvider::<Ethereum>::new_http(url))
}

/// Balance reader over alloy HTTP providers, one per RPC endpoint
pub struct RpcDataProvider {
    providers: DashMap<String, RootProvider<Ethereum>>,
}

impl RpcDataProvider {
    /// Create a new RPC data provider
    pub fn new() -> Self {
        Self { providers: DashMap::new() }
    }

    fn provider(&self, chain: &ChainConfig) -> anyhow::Result<RootProvider<Ethereum>> {
        if let Some(provider) = self.providers.get(&chain.rpc_url) {
            return Ok(provider.clone());
        }
        let provider = http_provider(&chain.rpc_url)?;
        self.providers.insert(chain.rpc_url.clone(), provider.clone());
        Ok(provider)
    }
}

impl Default for RpcDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProvider for RpcDataProvider {
    async fn fetch_native_balance(&self, chain: &ChainConfig, wallet: &Address) -> anyhow::Result<U256> {
        let provider = self.provider(chain)?;
        let balance = provider
            .get_balance(*wallet)
            .await
            .with_context(|| format!("eth_getBalance on {}", chain.name))?;
        Ok(balance)
    }

    async fn fetch_token_balance(
        &self,
        chain: &ChainConfig,
        token: &TokenConfig,
        wallet: &Address,
    ) -> anyhow::Result<U256> {
        let provider = self.provider(chain)?;
        let contract = IERC20::new(token.address, provider);
        let balance = contract
            .balanceOf(*wallet)
            .call()
            .await
            .with_context(|| format!("balanceOf {} on {}", token.symbol, chain.name))?;
        debug!("balanceOf {} on {} -> {}", token.symbol, chain.name, balance);
        Ok(balance)
    }
}
