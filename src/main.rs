use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use defi_portfolio_tracker::config::TrackerConfig;
use defi_portfolio_tracker::handlers::{CompositeEventHandler, ConsoleEventHandler};
use defi_portfolio_tracker::models::ChainRegistry;
use defi_portfolio_tracker::notifications::NotificationQueue;
use defi_portfolio_tracker::providers::rate_governor::RateGovernor;
use defi_portfolio_tracker::providers::websocket_provider::default_products;
use defi_portfolio_tracker::providers::{
    CoinGeckoPriceProvider, PriceSource, RealtimePriceCache, RealtimePriceListener, RpcDataProvider, RpcWalletProvider,
    TungsteniteTransport,
};
use defi_portfolio_tracker::storage::{self, ClientStore, JsonFileStore};
use defi_portfolio_tracker::tracker::{ChainBalanceReader, MockPositionProvider, PortfolioTracker, TrackerHandle};
use defi_portfolio_tracker::utils::clock::{Clock, SystemClock};
use defi_portfolio_tracker::wallet::WalletSession;

const WALLET_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Follow the wallet session: the connected account and chain drive the tracker
async fn connect_wallet(
    url: &str,
    store: Arc<dyn ClientStore>,
    chains: ChainRegistry,
    tracker: TrackerHandle,
) -> anyhow::Result<Arc<WalletSession>> {
    info!("Wallet endpoint: {}", url);
    let provider = Arc::new(RpcWalletProvider::new(url).context("Invalid WALLET_RPC_URL")?);
    provider.clone().start_polling(WALLET_POLL_INTERVAL);

    let session = Arc::new(WalletSession::new(Some(provider), store, chains.clone()));
    session.restore().await;
    if !session.is_connected() {
        session.connect().await;
    }
    session.clone().listen();

    let mut wallet_rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            let state = wallet_rx.borrow_and_update().clone();
            if let Some(error) = &state.error {
                warn!("Wallet: {}", error);
            }
            if let Some(chain_id) = state.chain_id {
                if chains.is_supported(chain_id) {
                    tracker.set_chain(chain_id);
                } else {
                    warn!("Wallet is on unsupported chain {}", chain_id);
                }
            }
            tracker.set_wallet(state.address);

            if wallet_rx.changed().await.is_err() {
                break;
            }
        }
    });

    Ok(session)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_level(true)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_file(true)
        .with_line_number(true)
        .init();

    dotenvy::dotenv().ok();

    tokio::runtime::Runtime::new()?.block_on(async {
        let config = TrackerConfig::from_env()?;

        info!("Initializing portfolio tracker...");
        info!("Chain ID: {}", config.chain_id);
        info!("Price API: {}", config.coingecko_base_url);
        info!("Price stream: {}", config.price_stream_url);

        let store: Arc<dyn ClientStore> = Arc::new(JsonFileStore::open(&config.state_file));
        info!("Theme: {}", storage::load_theme(store.as_ref()));

        let chains = config.chain_registry();
        info!("Supported chains: {:?}", chains.chain_ids());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let feed = CoinGeckoPriceProvider::new(config.coingecko_base_url.clone(), config.coingecko_api_key.clone());
        if !feed.has_api_key() {
            info!("No CoinGecko API key set, using the free tier");
        }
        let governor = RateGovernor::for_plan(clock.clone(), feed.has_api_key());
        info!("Price quota: {} requests per minute", governor.remaining());
        let prices = Arc::new(PriceSource::new(Arc::new(feed), governor, clock.clone()));

        let balances = Arc::new(ChainBalanceReader::new(Arc::new(RpcDataProvider::new()), chains.clone()));
        let realtime = RealtimePriceCache::new();

        let handler = CompositeEventHandler::new().with(Arc::new(ConsoleEventHandler::new()));
        let notifications = NotificationQueue::new(Arc::new(handler));

        let tracker = PortfolioTracker::new(
            balances,
            prices,
            Arc::new(MockPositionProvider),
            realtime.clone(),
            notifications,
            clock,
            config.tracker_settings(),
        );
        let (handle, tracker_task) = tracker.spawn();

        let listener = RealtimePriceListener::new(
            config.price_stream_url.clone(),
            default_products(),
            Arc::new(TungsteniteTransport),
            realtime,
        )
        .spawn();

        let watch_address = config.watch_address().context("Invalid WALLET_ADDRESS")?;
        let _session = match (&config.wallet_rpc_url, watch_address) {
            (Some(url), _) => Some(connect_wallet(url, store.clone(), chains, handle.clone()).await?),
            (None, Some(address)) => {
                info!("Watching address {}", address);
                handle.set_wallet(Some(address));
                None
            }
            (None, None) => {
                warn!("No wallet configured. Set WALLET_RPC_URL or WALLET_ADDRESS in .env");
                None
            }
        };

        info!("Portfolio tracker running. Press Ctrl+C to exit.");
        tokio::signal::ctrl_c().await?;

        info!("Shutting down...");
        handle.shutdown();
        listener.shutdown().await;
        if let Err(e) = tracker_task.await {
            warn!("Tracker task failed: {}", e);
        }

        Ok(())
    })
}
