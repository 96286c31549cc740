use std::collections::HashSet;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};

use crate::models::{
    Analytics, AssetBalance, DeFiPosition, PortfolioSnapshot, PositionKind, PriceMap, PriceOrigin, PriceQuote,
    RawBalance,
};

/// Balances below this amount are dropped from snapshots
pub const DEFAULT_DUST_THRESHOLD: f64 = 0.0001;

/// Lowest 24h change used when back-computing yesterday's value
const MIN_CHANGE_PCT: f64 = -99.99;

/// Everything a snapshot is derived from, besides realtime prices
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInputs {
    pub wallet: Address,
    pub chain_id: u64,
    pub balances: Vec<RawBalance>,
    pub rest_prices: PriceMap,
    pub positions: Vec<DeFiPosition>,
}

/// Price for `id`: realtime entry, else REST entry, else zero
pub fn resolve_price(id: &str, realtime: &PriceMap, rest: &PriceMap) -> (PriceQuote, PriceOrigin) {
    if let Some(quote) = realtime.get(id) {
        return (*quote, PriceOrigin::Realtime);
    }
    if let Some(quote) = rest.get(id) {
        return (*quote, PriceOrigin::Rest);
    }
    (PriceQuote::new(0.0, 0.0), PriceOrigin::Unpriced)
}

/// Value the holding had 24h ago given today's value and the percent change
///
/// Changes at or below -100% are clamped so the result stays finite.
pub fn implied_prior_value(value: f64, change_pct: f64) -> f64 {
    let pct = change_pct.max(MIN_CHANGE_PCT);
    value / (1.0 + pct / 100.0)
}

/// Price raw balances and drop dust
pub fn price_balances(
    balances: &[RawBalance],
    realtime: &PriceMap,
    rest: &PriceMap,
    dust_threshold: f64,
) -> Vec<AssetBalance> {
    balances
        .iter()
        .filter(|raw| raw.amount() >= dust_threshold)
        .map(|raw| {
            let (quote, origin) = resolve_price(&raw.token.price_id, realtime, rest);
            AssetBalance::priced(&raw.token, &raw.balance, quote.usd, quote.usd_24h_change, origin)
        })
        .collect()
}

/// Change over 24h in fiat and percent of `total_value`
pub fn change_24h(balances: &[AssetBalance], total_value: f64) -> (f64, f64) {
    let delta: f64 = balances
        .iter()
        .map(|b| b.value - implied_prior_value(b.value, b.price_change_24h))
        .sum();
    let pct = if total_value > 0.0 { delta / total_value * 100.0 } else { 0.0 };
    (delta, pct)
}

/// Highest 24h change; first encountered wins ties
pub fn best_performer(balances: &[AssetBalance], positions: &[DeFiPosition]) -> Option<AssetBalance> {
    let mut best: Option<&AssetBalance> = None;
    for balance in balances {
        match best {
            Some(current) if balance.price_change_24h <= current.price_change_24h => {}
            _ => best = Some(balance),
        }
    }
    best.or_else(|| positions.iter().flat_map(|p| p.tokens.iter()).next())
        .cloned()
}

/// Value-weighted APY across positions with a known APY
pub fn weighted_yield(positions: &[DeFiPosition], total_value: f64) -> f64 {
    if total_value <= 0.0 {
        return 0.0;
    }
    positions
        .iter()
        .filter_map(|p| p.apy.map(|apy| apy * p.total_value / total_value))
        .sum()
}

/// Heuristic risk score in 0..=100
pub fn risk_score(balances: &[AssetBalance], positions: &[DeFiPosition], total_value: f64) -> f64 {
    let distinct: HashSet<&str> = balances.iter().map(|b| b.symbol.as_str()).collect();
    let mut score: f64 = if distinct.len() < 3 { 50.0 } else { 30.0 };

    let defi_value: f64 = positions.iter().map(|p| p.total_value).sum();
    if total_value > 0.0 && defi_value / total_value > 0.7 {
        score += 20.0;
    }

    let liquidity = positions.iter().filter(|p| p.kind == PositionKind::Liquidity).count();
    if liquidity > 2 {
        score += 15.0;
    }

    score.clamp(0.0, 100.0)
}

/// Weighted count of holdings, positions and protocols, in 0..=100
pub fn diversification_score(balances: &[AssetBalance], positions: &[DeFiPosition]) -> f64 {
    let protocols: HashSet<&str> = positions.iter().map(|p| p.protocol.as_str()).collect();
    let score = balances.len() as f64 * 10.0 + positions.len() as f64 * 15.0 + protocols.len() as f64 * 5.0;
    score.clamp(0.0, 100.0)
}

pub fn compute_analytics(balances: &[AssetBalance], positions: &[DeFiPosition], total_value: f64) -> Analytics {
    Analytics {
        best_performer: best_performer(balances, positions),
        weighted_yield: weighted_yield(positions, total_value),
        risk_score: risk_score(balances, positions, total_value),
        diversification: diversification_score(balances, positions),
    }
}

/// Derive a complete snapshot from its inputs
///
/// Pure apart from the timestamp: the same inputs and realtime prices
/// always give the same figures.
pub fn build_snapshot(
    inputs: &SnapshotInputs,
    realtime: &PriceMap,
    dust_threshold: f64,
    timestamp: DateTime<Utc>,
) -> PortfolioSnapshot {
    let balances = price_balances(&inputs.balances, realtime, &inputs.rest_prices, dust_threshold);
    let wallet_value: f64 = balances.iter().map(|b| b.value).sum();
    let defi_value: f64 = inputs.positions.iter().map(|p| p.total_value).sum();
    let total_value = wallet_value + defi_value;

    let (change_24h_value, change_24h_pct) = change_24h(&balances, total_value);
    let analytics = compute_analytics(&balances, &inputs.positions, total_value);

    PortfolioSnapshot {
        timestamp,
        wallet_address: inputs.wallet,
        chain_id: inputs.chain_id,
        total_value,
        balances,
        positions: inputs.positions.clone(),
        change_24h_pct,
        change_24h_value,
        analytics,
    }
}
