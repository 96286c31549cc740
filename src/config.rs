use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Context;
use tracing::info;

use crate::error::BalanceError;
use crate::models::ChainRegistry;
use crate::providers::price_provider::COINGECKO_BASE_URL;
use crate::providers::websocket_provider::COINBASE_FEED_URL;
use crate::tracker::merge::DEFAULT_DUST_THRESHOLD;
use crate::tracker::portfolio_tracker::TrackerSettings;
use crate::utils::helper::parse_address;

/// Runtime configuration, read from the environment
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub chain_id: u64,
    pub eth_rpc_url: Option<String>,
    pub polygon_rpc_url: Option<String>,
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub price_stream_url: String,
    pub refresh_interval: Duration,
    pub dust_threshold: f64,
    pub wallet_rpc_url: Option<String>,
    pub wallet_address: Option<String>,
    pub state_file: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            eth_rpc_url: None,
            polygon_rpc_url: None,
            coingecko_base_url: COINGECKO_BASE_URL.to_string(),
            coingecko_api_key: None,
            price_stream_url: COINBASE_FEED_URL.to_string(),
            refresh_interval: Duration::from_secs(30),
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            wallet_rpc_url: None,
            wallet_address: None,
            state_file: PathBuf::from(".portfolio-state.json"),
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", name, raw)),
        None => Ok(default),
    }
}

impl TrackerConfig {
    /// Read every setting; call `dotenvy::dotenv()` first to pick up `.env`
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            chain_id: parsed("CHAIN_ID", defaults.chain_id)?,
            eth_rpc_url: var("ETH_RPC_URL"),
            polygon_rpc_url: var("POLYGON_RPC_URL"),
            coingecko_base_url: var("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            coingecko_api_key: var("COINGECKO_API_KEY"),
            price_stream_url: var("PRICE_STREAM_URL").unwrap_or(defaults.price_stream_url),
            refresh_interval: Duration::from_secs(parsed("REFRESH_INTERVAL_SECS", 30u64)?),
            dust_threshold: parsed("DUST_THRESHOLD", defaults.dust_threshold)?,
            wallet_rpc_url: var("WALLET_RPC_URL"),
            wallet_address: var("WALLET_ADDRESS"),
            state_file: var("STATE_FILE").map(PathBuf::from).unwrap_or(defaults.state_file),
        };

        if config.refresh_interval.is_zero() {
            anyhow::bail!("REFRESH_INTERVAL_SECS must be positive");
        }
        Ok(config)
    }

    /// Default registry with configured RPC overrides applied
    pub fn chain_registry(&self) -> ChainRegistry {
        let mut registry = ChainRegistry::default();
        if let Some(url) = &self.eth_rpc_url {
            info!("Using custom Ethereum RPC: {}", url);
            registry.set_rpc_url(1, url.clone());
        }
        if let Some(url) = &self.polygon_rpc_url {
            info!("Using custom Polygon RPC: {}", url);
            registry.set_rpc_url(137, url.clone());
        }
        registry
    }

    /// Parsed `WALLET_ADDRESS`, if set
    pub fn watch_address(&self) -> Result<Option<Address>, BalanceError> {
        self.wallet_address
            .as_deref()
            .map(|raw| parse_address(raw).map_err(|_| BalanceError::InvalidAddress(raw.to_string())))
            .transpose()
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            chain_id: self.chain_id,
            dust_threshold: self.dust_threshold,
            refresh_interval: self.refresh_interval,
        }
    }
}
