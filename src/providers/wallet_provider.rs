use std::borrow::Cow;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::WalletError;
use crate::models::ChainConfig;
use crate::providers::rpc_provider::http_provider;
use crate::traits::wallet_provider::{WalletEvent, WalletProvider};

const EVENT_CAPACITY: usize = 32;

fn wallet_error(err: TransportError, chain_id: Option<u64>) -> WalletError {
    match err {
        RpcError::ErrorResp(payload) => WalletError::from_code(payload.code, &payload.message, chain_id),
        RpcError::Transport(TransportErrorKind::HttpError(e)) => WalletError::Other {
            code: -32603,
            message: format!("wallet endpoint returned HTTP {}", e.status),
        },
        RpcError::Transport(_) => WalletError::ProviderMissing,
        other => WalletError::Other {
            code: -32603,
            message: other.to_string(),
        },
    }
}

fn hex_chain_id(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// What the poller saw on its last pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    pub reachable: bool,
    pub accounts: Vec<Address>,
    pub chain_id: Option<u64>,
}

/// Events implied by moving from `prev` to `next`
pub fn diff_events(prev: &Observed, next: &Observed) -> Vec<WalletEvent> {
    let mut events = Vec::new();

    if prev.reachable && !next.reachable {
        events.push(WalletEvent::Disconnect);
        return events;
    }
    if !prev.reachable && next.reachable {
        if let Some(chain_id) = next.chain_id {
            events.push(WalletEvent::Connect(chain_id));
        }
    }
    if !next.reachable {
        return events;
    }

    if prev.reachable && prev.chain_id != next.chain_id {
        if let Some(chain_id) = next.chain_id {
            events.push(WalletEvent::ChainChanged(chain_id));
        }
    }
    if prev.accounts != next.accounts {
        events.push(WalletEvent::AccountsChanged(next.accounts.clone()));
    }
    events
}

/// Wallet reached over JSON-RPC (a signer daemon or wallet bridge)
///
/// Requests map one to one onto EIP-1193 methods. The endpoint cannot push
/// notifications, so events are derived by polling `eth_accounts` and
/// `eth_chainId`; see [`RpcWalletProvider::start_polling`].
pub struct RpcWalletProvider {
    provider: RootProvider<Ethereum>,
    url: String,
    events: broadcast::Sender<WalletEvent>,
}

impl RpcWalletProvider {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let url = url.into();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            provider: http_provider(&url)?,
            url,
            events,
        })
    }

    async fn observe(&self) -> Observed {
        let accounts = self.accounts().await;
        let chain_id = self.chain_id().await;
        match (accounts, chain_id) {
            (Ok(accounts), Ok(chain_id)) => Observed {
                reachable: true,
                accounts,
                chain_id: Some(chain_id),
            },
            (Err(e), _) | (_, Err(e)) => {
                debug!("Wallet poll failed: {}", e);
                Observed::default()
            }
        }
    }

    /// Poll the endpoint every `every` and broadcast the differences
    pub fn start_polling(self: std::sync::Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            let mut last = self.observe().await;
            info!("Wallet poller started ({})", self.url);

            loop {
                ticker.tick().await;
                let next = self.observe().await;
                for event in diff_events(&last, &next) {
                    debug!("Wallet event: {:?}", event);
                    // no receivers is fine
                    let _ = self.events.send(event);
                }
                last = next;
            }
        })
    }

    /// Send a wallet method that answers with `null` on success
    async fn request_ack(&self, method: &'static str, params: Value, chain_id: u64) -> Result<(), WalletError> {
        match self
            .provider
            .raw_request::<_, Value>(Cow::Borrowed(method), params)
            .await
        {
            Ok(_) | Err(RpcError::NullResp) => Ok(()),
            Err(e) => Err(wallet_error(e, Some(chain_id))),
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.provider
            .raw_request::<_, Vec<Address>>(Cow::Borrowed("eth_requestAccounts"), json!([]))
            .await
            .map_err(|e| wallet_error(e, None))
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.provider.get_accounts().await.map_err(|e| wallet_error(e, None))
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.provider.get_chain_id().await.map_err(|e| wallet_error(e, None))
    }

    async fn balance(&self, address: &Address) -> Result<U256, WalletError> {
        self.provider
            .get_balance(*address)
            .await
            .map_err(|e| wallet_error(e, None))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.request_ack(
            "wallet_switchEthereumChain",
            json!([{ "chainId": hex_chain_id(chain_id) }]),
            chain_id,
        )
        .await
    }

    async fn add_chain(&self, chain: &ChainConfig) -> Result<(), WalletError> {
        let params = json!([{
            "chainId": hex_chain_id(chain.chain_id),
            "chainName": chain.name,
            "nativeCurrency": {
                "name": chain.native.name,
                "symbol": chain.native.symbol,
                "decimals": chain.native.decimals,
            },
            "rpcUrls": [chain.rpc_url],
            "blockExplorerUrls": [chain.block_explorer],
        }]);
        self.request_ack("wallet_addEthereumChain", params, chain.chain_id)
            .await
            .inspect_err(|e| warn!("Adding chain {} failed: {}", chain.chain_id, e))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::helper::parse_address;

    fn seen(accounts: &[&str], chain_id: u64) -> Observed {
        Observed {
            reachable: true,
            accounts: accounts.iter().map(|a| parse_address(a).unwrap()).collect(),
            chain_id: Some(chain_id),
        }
    }

    const A: &str = "0x000000000000000000000000000000000000000a";
    const B: &str = "0x000000000000000000000000000000000000000b";

    #[test]
    fn account_switch_is_reported() {
        let events = diff_events(&seen(&[A], 1), &seen(&[B], 1));
        assert_eq!(events, vec![WalletEvent::AccountsChanged(vec![parse_address(B).unwrap()])]);
    }

    #[test]
    fn chain_switch_is_reported() {
        let events = diff_events(&seen(&[A], 1), &seen(&[A], 137));
        assert_eq!(events, vec![WalletEvent::ChainChanged(137)]);
    }

    #[test]
    fn losing_the_endpoint_disconnects() {
        let events = diff_events(&seen(&[A], 1), &Observed::default());
        assert_eq!(events, vec![WalletEvent::Disconnect]);
    }

    #[test]
    fn coming_back_connects_then_reports_accounts() {
        let events = diff_events(&Observed::default(), &seen(&[A], 137));
        assert_eq!(
            events,
            vec![
                WalletEvent::Connect(137),
                WalletEvent::AccountsChanged(vec![parse_address(A).unwrap()]),
            ]
        );
    }

    #[test]
    fn transport_failures_mean_no_wallet() {
        let err = wallet_error(TransportErrorKind::custom_str("connection refused"), None);
        assert_eq!(err, WalletError::ProviderMissing);
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        assert!(RpcWalletProvider::new("not a url").is_err());
    }
}
