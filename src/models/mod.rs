//! Data models for the portfolio tracker

pub mod chain;
pub mod token;
pub mod price;
pub mod position;
pub mod portfolio;
pub mod wallet;

// Re-export for convenience
pub use chain::{ChainConfig, ChainRegistry};
pub use token::{AssetBalance, PriceOrigin, RawBalance, TokenConfig};
pub use price::{PriceMap, PriceQuote};
pub use position::{DeFiPosition, PositionKind, RewardEntry};
pub use portfolio::{Analytics, PortfolioSnapshot};
pub use wallet::WalletState;
