//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use defi_portfolio_tracker::error::AggregateError;
use defi_portfolio_tracker::models::{ChainConfig, ChainRegistry, DeFiPosition, PortfolioSnapshot, PriceMap, PriceQuote, TokenConfig};
use defi_portfolio_tracker::notifications::NotificationQueue;
use defi_portfolio_tracker::providers::{PriceSource, RateGovernor, RealtimePriceCache};
use defi_portfolio_tracker::tracker::{ChainBalanceReader, MockPositionProvider, PortfolioTracker, TrackerSettings};
use defi_portfolio_tracker::traits::{
    BalanceProvider, PortfolioEventHandler, PositionProvider, PriceFeed, PriceFeedError, UpdateTrigger,
};
use defi_portfolio_tracker::utils::clock::{Clock, ManualClock};

pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// Fixed balances per wallet; unknown wallets hold 2 ETH and 1000 USDC
#[derive(Default)]
pub struct StaticBalances {
    pub delays: HashMap<Address, Duration>,
    pub native: HashMap<Address, U256>,
}

#[async_trait]
impl BalanceProvider for StaticBalances {
    async fn fetch_native_balance(&self, _chain: &ChainConfig, wallet: &Address) -> anyhow::Result<U256> {
        if let Some(delay) = self.delays.get(wallet) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.native.get(wallet).copied().unwrap_or(U256::from(2 * ONE_ETH)))
    }

    async fn fetch_token_balance(
        &self,
        _chain: &ChainConfig,
        token: &TokenConfig,
        _wallet: &Address,
    ) -> anyhow::Result<U256> {
        match token.symbol.as_str() {
            "USDC" => Ok(U256::from(1_000_000_000u64)),
            _ => Ok(U256::ZERO),
        }
    }
}

/// Feed returning a fixed table, or failing with a fixed error
pub struct ScriptedFeed {
    pub quotes: PriceMap,
    pub rate_limited: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(entries: &[(&str, f64, f64)]) -> Self {
        Self {
            quotes: entries
                .iter()
                .map(|(id, usd, change)| (id.to_string(), PriceQuote::new(*usd, *change)))
                .collect(),
            rate_limited: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rate_limited() -> Self {
        let feed = Self::new(&[]);
        feed.rate_limited.store(true, Ordering::SeqCst);
        feed
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    async fn fetch_quotes(&self, ids: &[String]) -> Result<PriceMap, PriceFeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(PriceFeedError::RateLimited);
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.quotes.get(id).map(|q| (id.clone(), *q)))
            .collect())
    }
}

/// Mock positions until `fail` is set
#[derive(Default)]
pub struct SwitchablePositions {
    pub fail: AtomicBool,
}

#[async_trait]
impl PositionProvider for SwitchablePositions {
    async fn fetch_positions(&self, wallet: &Address, realtime: &PriceMap) -> anyhow::Result<Vec<DeFiPosition>> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("position service unavailable");
        }
        MockPositionProvider.fetch_positions(wallet, realtime).await
    }
}

/// Records everything the notification queue delivers
#[derive(Default)]
pub struct RecordingHandler {
    pub snapshots: Mutex<Vec<(Arc<PortfolioSnapshot>, UpdateTrigger)>>,
    pub errors: Mutex<Vec<AggregateError>>,
}

#[async_trait]
impl PortfolioEventHandler for RecordingHandler {
    async fn handle_snapshot(&self, snapshot: Arc<PortfolioSnapshot>, trigger: UpdateTrigger) {
        self.snapshots.lock().push((snapshot, trigger));
    }

    async fn handle_error(&self, error: &AggregateError) {
        self.errors.lock().push(error.clone());
    }
}

pub fn fixed_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

pub fn address(hex: &str) -> Address {
    hex.parse().unwrap()
}

pub struct Fixture {
    pub tracker: PortfolioTracker,
    pub realtime: RealtimePriceCache,
    pub handler: Arc<RecordingHandler>,
    pub clock: ManualClock,
}

pub fn fixture(
    balances: impl BalanceProvider + 'static,
    feed: Arc<dyn PriceFeed>,
    positions: Arc<dyn PositionProvider>,
) -> Fixture {
    let clock = fixed_clock();
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let governor = RateGovernor::new(shared_clock.clone(), Duration::ZERO, 1000, Duration::from_secs(60));
    let prices = Arc::new(PriceSource::new(feed, governor, shared_clock.clone()));
    let reader = Arc::new(ChainBalanceReader::new(Arc::new(balances), ChainRegistry::default()));
    let realtime = RealtimePriceCache::new();
    let handler = Arc::new(RecordingHandler::default());
    let notifications = NotificationQueue::new(handler.clone());

    let tracker = PortfolioTracker::new(
        reader,
        prices,
        positions,
        realtime.clone(),
        notifications,
        shared_clock,
        TrackerSettings::default(),
    );

    Fixture {
        tracker,
        realtime,
        handler,
        clock,
    }
}
