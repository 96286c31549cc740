use serde::Serialize;

use super::token::AssetBalance;

/// Category of a DeFi position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Lending,
    Liquidity,
    Staking,
    Farming,
}

/// Pending reward on a position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardEntry {
    pub token: String,
    pub amount: String,
    pub value: f64,
}

/// A position held in a DeFi protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeFiPosition {
    pub id: String,
    pub protocol: String,
    pub kind: PositionKind,
    pub tokens: Vec<AssetBalance>,
    pub total_value: f64,
    pub apy: Option<f64>,
    pub rewards: Vec<RewardEntry>,
}

impl DeFiPosition {
    /// Build a position; the total is the sum of the contained balances
    pub fn new(
        id: String,
        protocol: &str,
        kind: PositionKind,
        tokens: Vec<AssetBalance>,
        apy: Option<f64>,
        rewards: Vec<RewardEntry>,
    ) -> Self {
        let total_value = tokens.iter().map(|t| t.value).sum();
        Self {
            id,
            protocol: protocol.to_string(),
            kind,
            tokens,
            total_value,
            apy,
            rewards,
        }
    }
}
