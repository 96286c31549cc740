use alloy::primitives::Address;
use async_trait::async_trait;

use crate::models::{DeFiPosition, PriceMap};

/// Source of DeFi positions for a wallet
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Positions held by `wallet`; `realtime` prices the contained balances when present
    async fn fetch_positions(&self, wallet: &Address, realtime: &PriceMap) -> anyhow::Result<Vec<DeFiPosition>>;
}
