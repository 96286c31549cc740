use alloy::primitives::Address;
use serde::Serialize;

use crate::utils::helper::format_balance;

/// Static description of an asset tracked on a chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub name: String,
    /// Contract address, `Address::ZERO` for the chain's native asset
    pub address: Address,
    pub decimals: u8,
    /// Identifier used by the price sources (e.g. `ethereum`, `usd-coin`)
    pub price_id: String,
}

impl TokenConfig {
    /// Create a token description
    pub fn new(symbol: &str, name: &str, address: Address, decimals: u8, price_id: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            address,
            decimals,
            price_id: price_id.to_string(),
        }
    }

    /// Create the native-asset entry of a chain
    pub fn native(symbol: &str, name: &str, price_id: &str) -> Self {
        Self::new(symbol, name, Address::ZERO, 18, price_id)
    }

    /// Native assets use the zero address as sentinel
    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }
}

/// Balance read from chain, before pricing
#[derive(Debug, Clone, PartialEq)]
pub struct RawBalance {
    pub token: TokenConfig,
    /// Balance scaled by the token decimals, as a decimal string
    pub balance: String,
}

impl RawBalance {
    pub fn new(token: TokenConfig, balance: impl Into<String>) -> Self {
        Self { token, balance: balance.into() }
    }

    pub fn zero(token: TokenConfig) -> Self {
        Self::new(token, "0")
    }

    /// Parsed balance, zero when the string is not a number
    pub fn amount(&self) -> f64 {
        self.balance.parse::<f64>().unwrap_or(0.0)
    }
}

/// Where the unit price of a balance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrigin {
    Realtime,
    Rest,
    Default,
    Unpriced,
}

/// Priced balance as shown in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetBalance {
    pub symbol: String,
    pub name: String,
    pub address: Address,
    pub decimals: u8,
    pub balance: String,
    pub price: f64,
    pub price_change_24h: f64,
    pub value: f64,
    pub price_id: String,
    pub price_origin: PriceOrigin,
}

impl AssetBalance {
    /// Price a token balance; value is always `amount * price`
    pub fn priced(
        token: &TokenConfig,
        balance: &str,
        price: f64,
        price_change_24h: f64,
        price_origin: PriceOrigin,
    ) -> Self {
        let amount = balance.parse::<f64>().unwrap_or(0.0);
        Self {
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            address: token.address,
            decimals: token.decimals,
            balance: balance.to_string(),
            price,
            price_change_24h,
            value: amount * price,
            price_id: token.price_id.clone(),
            price_origin,
        }
    }

    /// Parsed balance amount
    pub fn amount(&self) -> f64 {
        self.balance.parse::<f64>().unwrap_or(0.0)
    }

    /// Compact amount with symbol, e.g. `1.2K USDC`
    pub fn formatted_amount(&self) -> String {
        format!("{} {}", format_balance(self.amount()), self.symbol)
    }
}
