use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::models::PriceQuote;
use crate::providers::connection::{ConnectionMachine, ConnectionState, NextStep, ReconnectPolicy};
use crate::providers::realtime_cache::RealtimePriceCache;

pub const COINBASE_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Frame read from the ticker socket
#[derive(Debug, Clone, PartialEq)]
pub enum TickerFrame {
    Text(String),
    Closed { normal: bool },
    Ignored,
}

/// Open streaming connection
#[async_trait]
pub trait TickerConnection: Send {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()>;

    /// Keep-alive
    async fn ping(&mut self) -> anyhow::Result<()>;

    /// Next frame, `None` once the stream ended without a close frame
    async fn next_frame(&mut self) -> Option<anyhow::Result<TickerFrame>>;

    async fn close(&mut self);
}

/// Opens ticker connections
#[async_trait]
pub trait TickerTransport: Send + Sync {
    async fn connect(&self, url: &str) -> anyhow::Result<Box<dyn TickerConnection>>;
}

/// WebSocket transport
pub struct TungsteniteTransport;

#[async_trait]
impl TickerTransport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> anyhow::Result<Box<dyn TickerConnection>> {
        let (stream, _) = connect_async(url).await?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TickerConnection for TungsteniteConnection {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn ping(&mut self) -> anyhow::Result<()> {
        self.stream.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<anyhow::Result<TickerFrame>> {
        let message = self.stream.next().await?;
        Some(match message {
            Ok(Message::Text(text)) => Ok(TickerFrame::Text(text)),
            Ok(Message::Close(frame)) => Ok(TickerFrame::Closed {
                normal: frame.map_or(false, |f| f.code == CloseCode::Normal),
            }),
            Ok(_) => Ok(TickerFrame::Ignored),
            Err(e) => Err(e.into()),
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Error closing ticker socket: {}", e);
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    product_id: Option<String>,
    price: Option<String>,
    open_24h: Option<String>,
}

/// Parsed ticker message
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    pub product_id: String,
    pub price: f64,
    pub open_24h: f64,
}

impl TickerUpdate {
    /// Percent change against the 24h open; zero without a usable open
    pub fn change_24h(&self) -> f64 {
        if self.open_24h > 0.0 {
            (self.price - self.open_24h) / self.open_24h * 100.0
        } else {
            0.0
        }
    }
}

/// Parse a feed message; non-ticker messages yield `Ok(None)`
pub fn parse_ticker(text: &str) -> anyhow::Result<Option<TickerUpdate>> {
    let message: FeedMessage = serde_json::from_str(text)?;
    if message.kind != "ticker" {
        return Ok(None);
    }

    let product_id = message
        .product_id
        .ok_or_else(|| anyhow::anyhow!("ticker without product_id"))?;
    let price = message
        .price
        .ok_or_else(|| anyhow::anyhow!("ticker {} without price", product_id))?
        .parse::<f64>()?;
    if !price.is_finite() || price <= 0.0 {
        anyhow::bail!("ticker {} with unusable price {}", product_id, price);
    }
    let open_24h = match message.open_24h {
        Some(open) => Some(open.parse::<f64>()?).filter(|o| o.is_finite()).unwrap_or(0.0),
        None => 0.0,
    };

    Ok(Some(TickerUpdate { product_id, price, open_24h }))
}

/// Subscribe request for the ticker channel
pub fn subscribe_message(products: &[String]) -> String {
    json!({
        "type": "subscribe",
        "product_ids": products,
        "channels": ["ticker"],
    })
    .to_string()
}

/// Default product -> asset identifier mapping
pub fn default_products() -> Vec<(String, String)> {
    vec![
        ("ETH-USD".to_string(), "ethereum".to_string()),
        ("BTC-USD".to_string(), "wrapped-bitcoin".to_string()),
        ("USDT-USD".to_string(), "tether".to_string()),
    ]
}

enum SessionEnd {
    Shutdown,
    Closed { normal: bool },
    Failed(anyhow::Error),
}

/// Listens to a public ticker feed and keeps the realtime cache current
pub struct RealtimePriceListener {
    url: String,
    products: Vec<(String, String)>,
    transport: Arc<dyn TickerTransport>,
    cache: RealtimePriceCache,
    policy: ReconnectPolicy,
    keepalive: Duration,
}

/// Running listener
pub struct RealtimeHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the connection gracefully and wait for the task to end
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Realtime listener task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl RealtimePriceListener {
    pub fn new(
        url: impl Into<String>,
        products: Vec<(String, String)>,
        transport: Arc<dyn TickerTransport>,
        cache: RealtimePriceCache,
    ) -> Self {
        Self {
            url: url.into(),
            products,
            transport,
            cache,
            policy: ReconnectPolicy::default(),
            keepalive: Duration::from_secs(30),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Start the listener task
    pub fn spawn(self) -> RealtimeHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let task = tokio::spawn(self.run(shutdown_rx, state_tx));
        RealtimeHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, state: watch::Sender<ConnectionState>) {
        let mut machine = ConnectionMachine::new(self.policy);

        loop {
            if *shutdown.borrow() {
                machine.stop();
            }
            if !machine.connect() {
                break;
            }
            state.send_replace(machine.state());
            info!("Connecting to price stream {}", self.url);

            let normal = match self.transport.connect(&self.url).await {
                Ok(mut conn) => {
                    machine.opened();
                    state.send_replace(machine.state());
                    self.cache.clear();
                    info!("Price stream connected");

                    match self.session(conn.as_mut(), &mut shutdown, &mut machine).await {
                        SessionEnd::Shutdown => {
                            machine.stop();
                            conn.close().await;
                            break;
                        }
                        SessionEnd::Closed { normal } => normal,
                        SessionEnd::Failed(e) => {
                            warn!("Price stream error: {}", e);
                            machine.transport_error();
                            state.send_replace(machine.state());
                            false
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to connect to price stream: {}", e);
                    machine.transport_error();
                    state.send_replace(machine.state());
                    false
                }
            };

            match machine.closed(normal) {
                NextStep::Stay => {
                    info!("Price stream closed");
                    break;
                }
                NextStep::GiveUp => {
                    warn!("Price stream unavailable, giving up after {} attempts", machine.attempts());
                    break;
                }
                NextStep::Reconnect { delay, attempt } => {
                    state.send_replace(machine.state());
                    info!("Reconnecting price stream in {:?} (attempt {})", delay, attempt);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {
                            machine.stop();
                            break;
                        }
                    }
                }
            }
        }

        state.send_replace(machine.state());
    }

    async fn session(
        &self,
        conn: &mut dyn TickerConnection,
        shutdown: &mut watch::Receiver<bool>,
        machine: &mut ConnectionMachine,
    ) -> SessionEnd {
        let products: Vec<String> = self.products.iter().map(|(p, _)| p.clone()).collect();
        if let Err(e) = conn.send_text(subscribe_message(&products)).await {
            return SessionEnd::Failed(e);
        }

        let mut keepalive = tokio::time::interval(self.keepalive);
        // first tick fires immediately
        keepalive.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                _ = keepalive.tick() => {
                    if let Err(e) = conn.ping().await {
                        return SessionEnd::Failed(e);
                    }
                }
                frame = conn.next_frame() => match frame {
                    None => return SessionEnd::Closed { normal: false },
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    Some(Ok(TickerFrame::Closed { normal })) => return SessionEnd::Closed { normal },
                    Some(Ok(TickerFrame::Text(text))) => {
                        if self.handle_message(&text) {
                            machine.healthy();
                        }
                    }
                    Some(Ok(TickerFrame::Ignored)) => {}
                },
            }
        }
    }

    /// Apply a feed message; true when it was a valid ticker
    fn handle_message(&self, text: &str) -> bool {
        match parse_ticker(text) {
            Ok(Some(update)) => {
                let Some((_, id)) = self.products.iter().find(|(p, _)| *p == update.product_id) else {
                    debug!("Ignoring ticker for unmapped product {}", update.product_id);
                    return true;
                };
                let quote = PriceQuote::new(update.price, update.change_24h());
                debug!("{} -> ${:.4} ({:+.2}%)", id, quote.usd, quote.usd_24h_change);
                self.cache.update(id, quote);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to parse price stream message: {}", e);
                false
            }
        }
    }
}
