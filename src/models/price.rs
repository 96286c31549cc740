use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Spot price and 24h change for one asset identifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
}

impl PriceQuote {
    pub fn new(usd: f64, usd_24h_change: f64) -> Self {
        Self { usd, usd_24h_change }
    }

    /// Quote handed out for identifiers nobody knows about
    pub fn neutral() -> Self {
        Self::new(1.0, 0.0)
    }
}

/// Asset identifier -> quote
pub type PriceMap = HashMap<String, PriceQuote>;
