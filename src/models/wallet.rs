use alloy::primitives::Address;
use serde::Serialize;

/// Wallet session as seen by the view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletState {
    pub address: Option<Address>,
    pub balance: Option<String>,
    pub chain_id: Option<u64>,
    pub is_connecting: bool,
    pub error: Option<String>,
}

impl WalletState {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}
