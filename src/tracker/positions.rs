//! Synthetic DeFi positions.
//!
//! No protocol contracts are queried. The set of positions is a pure function
//! of the wallet address so the same wallet always shows the same positions;
//! it stands in for real protocol integrations.

use alloy::primitives::{address, Address};
use async_trait::async_trait;

use crate::models::{AssetBalance, DeFiPosition, PositionKind, PriceMap, PriceOrigin, RewardEntry, TokenConfig};
use crate::traits::position_provider::PositionProvider;
use crate::utils::helper::trailing_hex_value;

struct Leg {
    token: TokenConfig,
    amount: &'static str,
    default_price: f64,
}

fn eth() -> TokenConfig {
    TokenConfig::native("ETH", "Ethereum", "ethereum")
}

fn usdc() -> TokenConfig {
    TokenConfig::new(
        "USDC",
        "USD Coin",
        address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        6,
        "usd-coin",
    )
}

fn usdt() -> TokenConfig {
    TokenConfig::new(
        "USDT",
        "Tether",
        address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
        6,
        "tether",
    )
}

fn wbtc() -> TokenConfig {
    TokenConfig::new(
        "WBTC",
        "Wrapped Bitcoin",
        address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
        8,
        "wrapped-bitcoin",
    )
}

fn price_leg(leg: Leg, realtime: &PriceMap) -> AssetBalance {
    match realtime.get(&leg.token.price_id) {
        Some(quote) => AssetBalance::priced(&leg.token, leg.amount, quote.usd, quote.usd_24h_change, PriceOrigin::Realtime),
        None => AssetBalance::priced(&leg.token, leg.amount, leg.default_price, 0.0, PriceOrigin::Default),
    }
}

/// Positions for `wallet`, priced from `realtime` where possible
///
/// Templates are picked by modulo tests on the trailing hex digits of the
/// address: liquidity when divisible by 2, Aave lending by 3, WBTC lending by 4.
pub fn mock_positions(wallet: &Address, realtime: &PriceMap) -> Vec<DeFiPosition> {
    let seed = trailing_hex_value(wallet);
    let prefix = format!("{:08x}", seed);
    let mut positions = Vec::new();

    if seed % 2 == 0 {
        let tokens = vec![
            price_leg(Leg { token: eth(), amount: "0.5", default_price: 2000.0 }, realtime),
            price_leg(Leg { token: usdc(), amount: "1000", default_price: 1.0 }, realtime),
        ];
        positions.push(DeFiPosition::new(
            format!("{}-uniswap-v3", prefix),
            "Uniswap V3",
            PositionKind::Liquidity,
            tokens,
            Some(24.5),
            vec![RewardEntry {
                token: "UNI".to_string(),
                amount: "12.5".to_string(),
                value: 87.5,
            }],
        ));
    }

    if seed % 3 == 0 {
        let tokens = vec![price_leg(Leg { token: usdt(), amount: "5000", default_price: 1.0 }, realtime)];
        positions.push(DeFiPosition::new(
            format!("{}-aave", prefix),
            "Aave",
            PositionKind::Lending,
            tokens,
            Some(3.2),
            Vec::new(),
        ));
    }

    if seed % 4 == 0 {
        let tokens = vec![price_leg(Leg { token: wbtc(), amount: "0.05", default_price: 35000.0 }, realtime)];
        positions.push(DeFiPosition::new(
            format!("{}-compound", prefix),
            "Compound",
            PositionKind::Lending,
            tokens,
            Some(1.8),
            Vec::new(),
        ));
    }

    positions
}

/// Position provider backed by [`mock_positions`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPositionProvider;

#[async_trait]
impl PositionProvider for MockPositionProvider {
    async fn fetch_positions(&self, wallet: &Address, realtime: &PriceMap) -> anyhow::Result<Vec<DeFiPosition>> {
        Ok(mock_positions(wallet, realtime))
    }
}
