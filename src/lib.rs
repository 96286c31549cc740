//! DeFi Portfolio Tracker Library
//!
//! Aggregates on-chain token balances, REST and streaming prices and DeFi
//! positions for an EVM wallet into valued, analyzed portfolio snapshots.

// Public modules - these are the API surface
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod providers;
pub mod storage;
pub mod tracker;
pub mod traits;
pub mod utils;
pub mod wallet;

// Re-export commonly used items for easier access
pub use config::TrackerConfig;
pub use error::{AggregateError, AggregateErrorKind, BalanceError, WalletError};
pub use models::{
    AssetBalance, ChainConfig, ChainRegistry, DeFiPosition, PortfolioSnapshot, PriceMap, PriceQuote, TokenConfig,
    WalletState,
};
pub use traits::{
    BalanceProvider, PortfolioEventHandler, PositionProvider, PriceFeed, UpdateTrigger, WalletEvent, WalletProvider,
};
pub use providers::{
    CoinGeckoPriceProvider, PriceSource, RateGovernor, RealtimePriceCache, RealtimePriceListener, RpcDataProvider,
    RpcWalletProvider,
};
pub use handlers::{CompositeEventHandler, ConsoleEventHandler};
pub use tracker::{LoadStatus, PortfolioTracker, TrackerHandle, TrackerState};
pub use wallet::WalletSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for library functions
pub type Result<T> = std::result::Result<T, anyhow::Error>;
