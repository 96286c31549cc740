use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::models::{ChainConfig, TokenConfig};

/// Core trait for reading on-chain balances
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Native balance of a wallet, in wei
    async fn fetch_native_balance(&self, chain: &ChainConfig, wallet: &Address) -> anyhow::Result<U256>;

    /// `balanceOf(wallet)` on a token contract, unscaled
    async fn fetch_token_balance(
        &self,
        chain: &ChainConfig,
        token: &TokenConfig,
        wallet: &Address,
    ) -> anyhow::Result<U256>;
}
