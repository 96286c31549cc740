use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::WalletError;
use crate::models::ChainConfig;

/// Notifications pushed by the wallet
#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Connect(u64),
    Disconnect,
}

/// Injected-wallet boundary (EIP-1193 surface)
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompt the user for account access
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Accounts already authorized, without prompting
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn balance(&self, address: &Address) -> Result<U256, WalletError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Ask the wallet to add a chain it does not know
    async fn add_chain(&self, chain: &ChainConfig) -> Result<(), WalletError>;

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
