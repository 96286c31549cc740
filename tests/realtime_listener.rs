use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use defi_portfolio_tracker::providers::connection::{ConnectionState, ReconnectPolicy};
use defi_portfolio_tracker::providers::realtime_cache::RealtimePriceCache;
use defi_portfolio_tracker::providers::websocket_provider::{
    default_products, RealtimePriceListener, TickerConnection, TickerFrame, TickerTransport,
};

const ETH_TICK: &str = r#"{"type":"ticker","product_id":"ETH-USD","price":"3300.00","open_24h":"3000.00"}"#;

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    pings: AtomicUsize,
    closes: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

/// `None` entries end the stream without a close frame; an empty script pends forever
type Script = Vec<Option<(Duration, TickerFrame)>>;

struct ScriptedConnection {
    frames: VecDeque<Option<(Duration, TickerFrame)>>,
    deadline: Option<tokio::time::Instant>,
    counters: Arc<Counters>,
}

#[async_trait]
impl TickerConnection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()> {
        self.counters.sent.lock().push(text);
        Ok(())
    }

    async fn ping(&mut self) -> anyhow::Result<()> {
        self.counters.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<anyhow::Result<TickerFrame>> {
        let delay = match self.frames.front() {
            None => return std::future::pending().await,
            Some(None) => return None,
            Some(Some((delay, _))) => *delay,
        };
        // the listener re-polls after every ping, so wait on a fixed deadline
        let deadline = *self.deadline.get_or_insert_with(|| tokio::time::Instant::now() + delay);
        tokio::time::sleep_until(deadline).await;
        self.deadline = None;
        let (_, frame) = self.frames.pop_front().flatten()?;
        Some(Ok(frame))
    }

    async fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one script per connect; fails once the scripts run out
struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    counters: Arc<Counters>,
}

impl ScriptedTransport {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            counters: Arc::new(Counters::default()),
        })
    }
}

#[async_trait]
impl TickerTransport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> anyhow::Result<Box<dyn TickerConnection>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().pop_front();
        match script {
            Some(frames) => Ok(Box::new(ScriptedConnection {
                frames: frames.into(),
                deadline: None,
                counters: self.counters.clone(),
            })),
            None => anyhow::bail!("connection refused"),
        }
    }
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_attempts: 5,
    }
}

fn listener(transport: Arc<ScriptedTransport>, cache: RealtimePriceCache) -> RealtimePriceListener {
    RealtimePriceListener::new("wss://feed.test", default_products(), transport, cache).with_policy(fast_policy())
}

fn frame(text: &str) -> Option<(Duration, TickerFrame)> {
    Some((Duration::ZERO, TickerFrame::Text(text.to_string())))
}

fn normal_close() -> Option<(Duration, TickerFrame)> {
    Some((Duration::ZERO, TickerFrame::Closed { normal: true }))
}

async fn wait_finished(handle: &defi_portfolio_tracker::providers::RealtimeHandle) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("listener did not finish");
}

#[tokio::test]
async fn ticks_land_in_the_cache_and_normal_close_stops() {
    let transport = ScriptedTransport::new(vec![vec![frame(ETH_TICK), frame("garbage"), normal_close()]]);
    let cache = RealtimePriceCache::new();
    let handle = listener(transport.clone(), cache.clone()).spawn();

    wait_finished(&handle).await;

    let eth = cache.get("ethereum").expect("ethereum quote");
    assert_eq!(eth.usd, 3300.0);
    assert!((eth.usd_24h_change - 10.0).abs() < 1e-9);
    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 1);
    assert_eq!(*handle.state().borrow(), ConnectionState::Disconnected);

    let sent = transport.counters.sent.lock();
    assert!(sent[0].contains("\"subscribe\""));
    assert!(sent[0].contains("ETH-USD"));
}

#[tokio::test]
async fn reconnect_starts_from_an_empty_cache() {
    let transport = ScriptedTransport::new(vec![vec![frame(ETH_TICK), None], vec![normal_close()]]);
    let cache = RealtimePriceCache::new();
    let handle = listener(transport.clone(), cache.clone()).spawn();

    wait_finished(&handle).await;

    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn gives_up_after_bounded_attempts() {
    let transport = ScriptedTransport::new(Vec::new());
    let handle = listener(transport.clone(), RealtimePriceCache::new()).spawn();

    wait_finished(&handle).await;

    // first try plus five reconnects
    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 6);
    assert_eq!(*handle.state().borrow(), ConnectionState::Error);
}

#[tokio::test]
async fn flapping_server_still_exhausts_attempts() {
    // every connect succeeds, then the stream drops without a close frame
    let transport = ScriptedTransport::new((0..20).map(|_| vec![None]).collect());
    let handle = listener(transport.clone(), RealtimePriceCache::new()).spawn();

    wait_finished(&handle).await;

    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 6);
    assert_eq!(*handle.state().borrow(), ConnectionState::Error);
}

#[tokio::test]
async fn delivering_ticks_resets_the_attempt_budget() {
    // five silent drops, one connection with data, then drops until the budget is spent
    let mut scripts: Vec<Script> = (0..5).map(|_| vec![None]).collect();
    scripts.push(vec![frame(ETH_TICK), None]);
    scripts.extend((0..20).map(|_| vec![None]));
    let transport = ScriptedTransport::new(scripts);
    let handle = listener(transport.clone(), RealtimePriceCache::new()).spawn();

    wait_finished(&handle).await;

    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 11);
    assert_eq!(*handle.state().borrow(), ConnectionState::Error);
}

#[tokio::test]
async fn keepalive_pings_while_idle() {
    let transport = ScriptedTransport::new(vec![vec![Some((
        Duration::from_millis(120),
        TickerFrame::Closed { normal: true },
    ))]]);
    let handle = listener(transport.clone(), RealtimePriceCache::new())
        .with_keepalive(Duration::from_millis(20))
        .spawn();

    wait_finished(&handle).await;

    assert!(transport.counters.pings.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn shutdown_closes_the_socket() {
    let transport = ScriptedTransport::new(vec![vec![]]);
    let handle = listener(transport.clone(), RealtimePriceCache::new()).spawn();

    let mut state = handle.state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .expect("never connected")
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("shutdown hung");

    assert_eq!(transport.counters.closes.load(Ordering::SeqCst), 1);
    assert_eq!(transport.counters.connects.load(Ordering::SeqCst), 1);
}
