use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{PriceMap, PriceQuote};
use crate::providers::rate_governor::{Admission, RateGovernor};
use crate::traits::price_provider::{PriceFeed, PriceFeedError};
use crate::utils::clock::Clock;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko `/simple/price` client
pub struct CoinGeckoPriceProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoPriceProvider {
    /// Create a new CoinGecko client; blank API keys are ignored
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn parse_quotes(body: Value) -> Result<PriceMap, PriceFeedError> {
        let entries = match body {
            Value::Object(entries) => entries,
            other => {
                return Err(PriceFeedError::Malformed(format!("expected object, got {}", other)));
            }
        };

        let mut quotes = HashMap::with_capacity(entries.len());
        for (id, entry) in entries {
            let usd = entry
                .get("usd")
                .and_then(Value::as_f64)
                .ok_or_else(|| PriceFeedError::Malformed(format!("missing usd price for {}", id)))?;
            let change = entry.get("usd_24h_change").and_then(Value::as_f64).unwrap_or(0.0);
            quotes.insert(id, PriceQuote::new(usd, change));
        }
        Ok(quotes)
    }
}

impl Default for CoinGeckoPriceProvider {
    fn default() -> Self {
        Self::new(COINGECKO_BASE_URL, None)
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoPriceProvider {
    async fn fetch_quotes(&self, ids: &[String]) -> Result<PriceMap, PriceFeedError> {
        let url = format!("{}/simple/price", self.base_url);
        let joined = ids.join(",");
        let mut query: Vec<(&str, &str)> = vec![
            ("ids", joined.as_str()),
            ("vs_currencies", "usd"),
            ("include_24hr_change", "true"),
        ];
        if let Some(key) = &self.api_key {
            query.push(("x_cg_pro_api_key", key.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header("Accept", "application/json")
            .header("User-Agent", "defi-portfolio-tracker/0.1")
            .send()
            .await
            .map_err(|e| PriceFeedError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceFeedError::RateLimited);
        }
        if !status.is_success() {
            return Err(PriceFeedError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceFeedError::Malformed(e.to_string()))?;

        let quotes = Self::parse_quotes(body)?;
        debug!("Fetched {} live quotes", quotes.len());
        Ok(quotes)
    }
}

/// (identifier, base price, drift scale, base 24h change, change jitter, price jitter)
const SYNTHETIC_TABLE: &[(&str, f64, f64, f64, f64, f64)] = &[
    ("ethereum", 2000.0, 1.0, 2.5, 10.0, 10.0),
    ("usd-coin", 1.0, 0.0, 0.0, 0.5, 0.02),
    ("tether", 1.0, 0.0, 0.0, 0.3, 0.02),
    ("wrapped-bitcoin", 35000.0, 1.2, 1.8, 8.0, 175.0),
    ("uniswap", 6.5, 0.8, 3.2, 15.0, 0.03),
    ("matic-network", 0.85, 1.0, 4.1, 12.0, 0.004),
    ("binancecoin", 300.0, 1.0, 1.2, 6.0, 1.5),
];

const DAY_MS: f64 = 86_400_000.0;

/// Pseudo-market prices used when the live feed is unavailable
///
/// Prices drift on a day-scale sine wave; jitter comes from an RNG seeded
/// with the timestamp, so the same instant always yields the same quotes.
pub fn synthetic_quotes(ids: &[String], at: DateTime<Utc>) -> PriceMap {
    let millis = at.timestamp_millis();
    let day_variation = (millis as f64 / DAY_MS).sin() * 0.1;
    let mut rng = StdRng::seed_from_u64(millis as u64);

    let mut quotes = HashMap::with_capacity(ids.len());
    for id in ids {
        let quote = match SYNTHETIC_TABLE.iter().find(|row| row.0 == id.as_str()) {
            Some(&(_, base, drift, change, change_jitter, price_jitter)) => {
                let price = base
                    + base * day_variation * drift
                    + (rng.random::<f64>() - 0.5) * price_jitter;
                let change = change + (rng.random::<f64>() - 0.5) * change_jitter;
                PriceQuote::new(price, change)
            }
            None => PriceQuote::neutral(),
        };
        quotes.insert(id.clone(), quote);
    }
    quotes
}

/// Price source that never fails: live feed behind a rate governor, synthetic fallback
pub struct PriceSource {
    feed: Arc<dyn PriceFeed>,
    governor: RateGovernor,
    clock: Arc<dyn Clock>,
}

impl PriceSource {
    pub fn new(feed: Arc<dyn PriceFeed>, governor: RateGovernor, clock: Arc<dyn Clock>) -> Self {
        Self { feed, governor, clock }
    }

    /// Quotes for `ids`; falls back to synthetic prices on any failure
    pub async fn fetch_prices(&self, ids: &[String]) -> PriceMap {
        if ids.is_empty() {
            return PriceMap::new();
        }

        match self.governor.admit() {
            Admission::Exhausted => {
                warn!("Price request quota exhausted, using synthetic prices");
                return synthetic_quotes(ids, self.clock.now());
            }
            Admission::Proceed { wait } => {
                if !wait.is_zero() {
                    debug!("Spacing price request by {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }

        match self.feed.fetch_quotes(ids).await {
            Ok(quotes) => {
                debug!("{} price requests left in this window", self.governor.remaining());
                quotes
            }
            Err(e) => {
                warn!("Failed to fetch live prices, using synthetic prices: {}", e);
                synthetic_quotes(ids, self.clock.now())
            }
        }
    }
}
