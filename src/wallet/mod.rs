//! Wallet connection lifecycle

pub mod session;

pub use session::WalletSession;
