use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::position::DeFiPosition;
use super::token::AssetBalance;

/// Derived portfolio figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analytics {
    pub best_performer: Option<AssetBalance>,
    /// Value-weighted APY across DeFi positions, in percent
    pub weighted_yield: f64,
    /// 0..=100, higher is riskier
    pub risk_score: f64,
    /// 0..=100
    pub diversification: f64,
}

/// Snapshot of a wallet portfolio at a specific time
///
/// Every figure is derived from `balances` and `positions`; snapshots are
/// rebuilt, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub wallet_address: Address,
    pub chain_id: u64,
    pub total_value: f64,
    pub balances: Vec<AssetBalance>,
    pub positions: Vec<DeFiPosition>,
    pub change_24h_pct: f64,
    pub change_24h_value: f64,
    pub analytics: Analytics,
}

impl PortfolioSnapshot {
    /// Get balance for a specific symbol
    pub fn get_balance(&self, symbol: &str) -> Option<&AssetBalance> {
        self.balances.iter().find(|b| b.symbol == symbol)
    }

    /// Check if snapshot is empty (no tokens, no positions)
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.positions.is_empty()
    }

    /// Number of tokens in portfolio
    pub fn token_count(&self) -> usize {
        self.balances.len()
    }

    /// Fiat value held in wallet balances
    pub fn wallet_value(&self) -> f64 {
        self.balances.iter().map(|b| b.value).sum()
    }

    /// Fiat value held in DeFi positions
    pub fn defi_value(&self) -> f64 {
        self.positions.iter().map(|p| p.total_value).sum()
    }
}
