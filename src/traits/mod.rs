//! Core traits for the portfolio tracker

pub mod data_provider;
pub mod price_provider;
pub mod position_provider;
pub mod wallet_provider;
pub mod event_handler;

// Re-export for convenience
pub use data_provider::BalanceProvider;
pub use price_provider::{PriceFeed, PriceFeedError};
pub use position_provider::PositionProvider;
pub use wallet_provider::{WalletEvent, WalletProvider};
pub use event_handler::{PortfolioEventHandler, UpdateTrigger};
