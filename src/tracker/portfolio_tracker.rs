use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::AggregateError;
use crate::models::PortfolioSnapshot;
use crate::notifications::NotificationQueue;
use crate::providers::price_provider::PriceSource;
use crate::providers::realtime_cache::RealtimePriceCache;
use crate::tracker::balance_reader::ChainBalanceReader;
use crate::tracker::merge::{build_snapshot, SnapshotInputs, DEFAULT_DUST_THRESHOLD};
use crate::traits::event_handler::UpdateTrigger;
use crate::traits::position_provider::PositionProvider;
use crate::utils::clock::Clock;

/// Aggregator lifecycle for the current wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// What the view reads; replaced as a whole on every change
#[derive(Debug, Clone)]
pub struct TrackerState {
    pub status: LoadStatus,
    pub wallet: Option<Address>,
    pub chain_id: u64,
    pub snapshot: Option<Arc<PortfolioSnapshot>>,
    pub error: Option<AggregateError>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub chain_id: u64,
    pub dust_threshold: f64,
    pub refresh_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            chain_id: 1,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

enum Command {
    SetWallet(Option<Address>),
    SetChain(u64),
    Refresh,
    Shutdown,
}

struct LoadResult {
    seq: u64,
    outcome: Result<SnapshotInputs, AggregateError>,
}

/// Control surface of a running tracker
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<TrackerState>,
}

impl TrackerHandle {
    /// Track `wallet`, or stop tracking with `None`; in-flight results for the old wallet are dropped
    pub fn set_wallet(&self, wallet: Option<Address>) {
        let _ = self.commands.send(Command::SetWallet(wallet));
    }

    pub fn set_chain(&self, chain_id: u64) {
        let _ = self.commands.send(Command::SetChain(chain_id));
    }

    /// Re-run the full load cycle
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.clone()
    }

    pub fn current(&self) -> TrackerState {
        self.state.borrow().clone()
    }

    /// Stop the refresh timer and the actor; later results are discarded
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Main portfolio tracker
///
/// Merges on-chain balances, REST prices, realtime prices and DeFi positions
/// into snapshots. Runs as a single actor task; loads run on spawned tasks
/// and report back tagged with a sequence number.
pub struct PortfolioTracker {
    balances: Arc<ChainBalanceReader>,
    prices: Arc<PriceSource>,
    positions: Arc<dyn PositionProvider>,
    realtime: RealtimePriceCache,
    notifications: NotificationQueue,
    clock: Arc<dyn Clock>,
    settings: TrackerSettings,
}

impl PortfolioTracker {
    /// Create a new portfolio tracker
    pub fn new(
        balances: Arc<ChainBalanceReader>,
        prices: Arc<PriceSource>,
        positions: Arc<dyn PositionProvider>,
        realtime: RealtimePriceCache,
        notifications: NotificationQueue,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            balances,
            prices,
            positions,
            realtime,
            notifications,
            clock,
            settings,
        }
    }

    /// Fetch balances, prices and positions concurrently
    pub async fn load_inputs(&self, wallet: Address, chain_id: u64) -> Result<SnapshotInputs, AggregateError> {
        let price_ids = self
            .balances
            .chains()
            .get(chain_id)
            .map(|chain| chain.price_ids())
            .unwrap_or_default();
        let realtime = self.realtime.snapshot();

        let (balances, rest_prices, positions) = tokio::join!(
            self.balances.read_balances(&wallet, chain_id),
            self.prices.fetch_prices(&price_ids),
            self.positions.fetch_positions(&wallet, &realtime),
        );

        let balances = balances.map_err(|e| {
            error!("Balance fetch failed for {}: {}", wallet, e);
            AggregateError::balances(&e)
        })?;
        let positions = positions.map_err(|e| {
            error!("Position fetch failed for {}: {}", wallet, e);
            AggregateError::positions(&e)
        })?;

        Ok(SnapshotInputs {
            wallet,
            chain_id,
            balances,
            rest_prices,
            positions,
        })
    }

    /// Derive a snapshot from inputs and the current realtime prices
    pub fn derive_snapshot(&self, inputs: &SnapshotInputs) -> PortfolioSnapshot {
        build_snapshot(
            inputs,
            &self.realtime.snapshot(),
            self.settings.dust_threshold,
            self.clock.now(),
        )
    }

    /// Take a snapshot of the current portfolio
    pub async fn take_snapshot(&self, wallet: Address) -> Result<PortfolioSnapshot, AggregateError> {
        let inputs = self.load_inputs(wallet, self.settings.chain_id).await?;
        Ok(self.derive_snapshot(&inputs))
    }

    /// Start the tracker actor
    pub fn spawn(self) -> (TrackerHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TrackerState {
            status: LoadStatus::Idle,
            wallet: None,
            chain_id: self.settings.chain_id,
            snapshot: None,
            error: None,
        });

        let task = tokio::spawn(self.run(commands_rx, state_tx));
        let handle = TrackerHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (handle, task)
    }

    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>, state: watch::Sender<TrackerState>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<LoadResult>();
        let mut realtime_rx = self.realtime.subscribe();

        let mut refresh = tokio::time::interval(self.settings.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        refresh.tick().await;

        let mut session = Session {
            wallet: None,
            chain_id: self.settings.chain_id,
            load_seq: 0,
            inputs: None,
            state,
        };

        info!("Portfolio tracker started (chain {})", session.chain_id);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SetWallet(wallet)) => {
                        if wallet == session.wallet {
                            continue;
                        }
                        info!("Tracking wallet: {:?}", wallet);
                        session.wallet = wallet;
                        session.reset();
                        if session.wallet.is_some() {
                            self.begin_load(&mut session, &done_tx);
                            refresh.reset();
                        }
                    }
                    Some(Command::SetChain(chain_id)) => {
                        if chain_id == session.chain_id {
                            continue;
                        }
                        info!("Switching to chain {}", chain_id);
                        session.chain_id = chain_id;
                        session.reset();
                        if session.wallet.is_some() {
                            self.begin_load(&mut session, &done_tx);
                            refresh.reset();
                        }
                    }
                    Some(Command::Refresh) => {
                        if session.wallet.is_some() {
                            self.begin_load(&mut session, &done_tx);
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(result) = done_rx.recv() => self.finish_load(&mut session, result),
                _ = refresh.tick(), if session.wallet.is_some() => {
                    debug!("Auto-refresh");
                    self.begin_load(&mut session, &done_tx);
                }
                Ok(()) = realtime_rx.changed() => self.apply_realtime(&session),
            }
        }

        // invalidate anything still in flight
        session.load_seq += 1;
        self.notifications.shutdown();
        info!("Portfolio tracker stopped");
    }

    fn begin_load(&self, session: &mut Session, done: &mpsc::UnboundedSender<LoadResult>) {
        let Some(wallet) = session.wallet else {
            return;
        };
        session.load_seq += 1;
        let seq = session.load_seq;
        let chain_id = session.chain_id;

        session.state.send_modify(|s| {
            s.status = LoadStatus::Loading;
            s.error = None;
        });

        let tracker = self.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let outcome = tracker.load_inputs(wallet, chain_id).await;
            let _ = done.send(LoadResult { seq, outcome });
        });
    }

    fn finish_load(&self, session: &mut Session, result: LoadResult) {
        if result.seq != session.load_seq {
            debug!("Discarding stale load #{}", result.seq);
            return;
        }

        match result.outcome {
            Ok(inputs) => {
                let snapshot = Arc::new(self.derive_snapshot(&inputs));
                session.inputs = Some(Arc::new(inputs));
                info!(
                    "Portfolio refreshed: {} balances, {} positions, ${:.2}",
                    snapshot.balances.len(),
                    snapshot.positions.len(),
                    snapshot.total_value
                );
                session.publish(LoadStatus::Ready, Some(snapshot.clone()), None);
                self.notifications.notify_snapshot(snapshot, UpdateTrigger::Refresh);
            }
            Err(e) => {
                let previous = session.state.borrow().snapshot.clone();
                session.publish(LoadStatus::Error, previous, Some(e.clone()));
                self.notifications.notify_error(&e);
            }
        }
    }

    fn apply_realtime(&self, session: &Session) {
        let Some(inputs) = session.inputs.as_ref() else {
            return;
        };
        let snapshot = Arc::new(self.derive_snapshot(inputs));
        session.state.send_modify(|s| s.snapshot = Some(snapshot.clone()));
        self.notifications.notify_snapshot(snapshot, UpdateTrigger::Realtime);
    }
}

struct Session {
    wallet: Option<Address>,
    chain_id: u64,
    load_seq: u64,
    inputs: Option<Arc<SnapshotInputs>>,
    state: watch::Sender<TrackerState>,
}

impl Session {
    /// Forget everything derived for the previous wallet or chain
    fn reset(&mut self) {
        self.load_seq += 1;
        self.inputs = None;
        let status = if self.wallet.is_some() { LoadStatus::Loading } else { LoadStatus::Idle };
        self.state.send_replace(TrackerState {
            status,
            wallet: self.wallet,
            chain_id: self.chain_id,
            snapshot: None,
            error: None,
        });
    }

    fn publish(&self, status: LoadStatus, snapshot: Option<Arc<PortfolioSnapshot>>, error: Option<AggregateError>) {
        self.state.send_replace(TrackerState {
            status,
            wallet: self.wallet,
            chain_id: self.chain_id,
            snapshot,
            error,
        });
    }
}

// Implement Clone for PortfolioTracker
impl Clone for PortfolioTracker {
    fn clone(&self) -> Self {
        Self {
            balances: self.balances.clone(),
            prices: self.prices.clone(),
            positions: self.positions.clone(),
            realtime: self.realtime.clone(),
            notifications: self.notifications.clone(),
            clock: self.clock.clone(),
            settings: self.settings,
        }
    }
}
