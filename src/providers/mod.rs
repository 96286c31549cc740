//! Data providers for fetching portfolio information

pub mod connection;
pub mod price_provider;
pub mod rate_governor;
pub mod realtime_cache;
pub mod rpc_provider;
pub mod wallet_provider;
pub mod websocket_provider;

// Re-export for convenience
pub use connection::{ConnectionMachine, ConnectionState, ReconnectPolicy};
pub use price_provider::{CoinGeckoPriceProvider, PriceSource};
pub use rate_governor::RateGovernor;
pub use realtime_cache::RealtimePriceCache;
pub use rpc_provider::RpcDataProvider;
pub use wallet_provider::RpcWalletProvider;
pub use websocket_provider::{RealtimeHandle, RealtimePriceListener, TungsteniteTransport};
