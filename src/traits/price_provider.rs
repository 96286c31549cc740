use async_trait::async_trait;
use thiserror::Error;

use crate::models::PriceMap;

#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("bad status: {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait for live price feeds
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Spot price and 24h change for a batch of asset identifiers
    async fn fetch_quotes(&self, ids: &[String]) -> Result<PriceMap, PriceFeedError>;
}
