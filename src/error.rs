use std::time::Duration;

use thiserror::Error;

/// Failure of a whole balance batch; per-token failures never surface here
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Wallet provider errors, keyed by EIP-1193 / JSON-RPC codes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("No wallet provider available")]
    ProviderMissing,
    #[error("No accounts found")]
    NoAccounts,
    #[error("User rejected the request")]
    UserRejected,
    #[error("A request is already pending")]
    RequestPending,
    #[error("Unrecognized chain {0}")]
    UnrecognizedChain(u64),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Provider disconnected")]
    Disconnected,
    #[error("Wallet error {code}: {message}")]
    Other { code: i64, message: String },
}

impl WalletError {
    /// Map a provider error code; `chain_id` is used for 4902
    pub fn from_code(code: i64, message: &str, chain_id: Option<u64>) -> Self {
        match code {
            4001 => WalletError::UserRejected,
            -32002 => WalletError::RequestPending,
            4902 => WalletError::UnrecognizedChain(chain_id.unwrap_or_default()),
            4100 => WalletError::Unauthorized,
            4900 | 4901 => WalletError::Disconnected,
            _ => WalletError::Other { code, message: message.to_string() },
        }
    }

    /// Message shown to the user in the wallet state
    pub fn user_message(&self) -> String {
        match self {
            WalletError::ProviderMissing => {
                "No wallet detected. Install a browser wallet to continue.".to_string()
            }
            WalletError::NoAccounts => "No accounts found in the wallet.".to_string(),
            WalletError::UserRejected => "Connection request was rejected.".to_string(),
            WalletError::RequestPending => {
                "A wallet request is already pending. Check your wallet.".to_string()
            }
            WalletError::UnrecognizedChain(id) => {
                format!("Network {} is not added to your wallet.", id)
            }
            WalletError::Unauthorized => "The wallet has not authorized this site.".to_string(),
            WalletError::Disconnected => "The wallet is disconnected.".to_string(),
            WalletError::Other { message, .. } => {
                if message.is_empty() {
                    "Failed to connect wallet".to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

/// Which fetch took a refresh cycle down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateErrorKind {
    Balances,
    Positions,
}

/// Retryable failure of a refresh cycle, shown next to the last good snapshot
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct AggregateError {
    pub kind: AggregateErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl AggregateError {
    pub fn balances(error: &BalanceError) -> Self {
        let retry_after = match error {
            BalanceError::Rpc(_) => Some(Duration::from_secs(30)),
            _ => None,
        };
        Self {
            kind: AggregateErrorKind::Balances,
            message: format!("Failed to fetch balances: {}", error),
            retry_after,
        }
    }

    pub fn positions(error: &anyhow::Error) -> Self {
        Self {
            kind: AggregateErrorKind::Positions,
            message: format!("Failed to fetch DeFi positions: {}", error),
            retry_after: None,
        }
    }
}
