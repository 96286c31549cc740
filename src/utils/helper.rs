use std::str::FromStr;

use alloy::primitives::{Address, U256};

/// Parse an address from string, with better error messages
pub fn parse_address(s: &str) -> anyhow::Result<Address> {
    Address::from_str(s.trim()).map_err(|e| anyhow::anyhow!("Invalid address {}: {}", s, e))
}

/// Scale an integer amount by `decimals` into a decimal string without trailing zeros
pub fn format_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / scale;
    let fraction = raw % scale;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Numeric value of the last 8 hex digits of an address
pub fn trailing_hex_value(address: &Address) -> u64 {
    let hex = address.to_string();
    let tail = &hex[hex.len() - 8..];
    u64::from_str_radix(tail, 16).unwrap_or(0)
}

/// Format an address for display (truncated)
pub fn format_address(address: &Address) -> String {
    let s = address.to_string();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}

/// Compact token amount
pub fn format_balance(amount: f64) -> String {
    if amount == 0.0 {
        "0".to_string()
    } else if amount < 0.0001 {
        "<0.0001".to_string()
    } else if amount < 1.0 {
        format!("{:.4}", amount)
    } else if amount < 1_000.0 {
        format!("{:.2}", amount)
    } else if amount < 1_000_000.0 {
        format!("{:.1}K", amount / 1_000.0)
    } else {
        format!("{:.1}M", amount / 1_000_000.0)
    }
}

/// Compact USD amount
pub fn format_currency(value: f64) -> String {
    if value == 0.0 {
        "$0.00".to_string()
    } else if value < 0.01 {
        "<$0.01".to_string()
    } else if value < 1_000.0 {
        format!("${:.2}", value)
    } else if value < 1_000_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.1}M", value / 1_000_000.0)
    }
}

/// Signed percentage with two decimals
pub fn format_percentage(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}
