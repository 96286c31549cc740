use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::WalletError;
use crate::models::{ChainRegistry, WalletState};
use crate::storage::{self, ClientStore};
use crate::traits::wallet_provider::{WalletEvent, WalletProvider};
use crate::utils::helper::format_units;

/// Connection state of the user's wallet
///
/// Failures end up in [`WalletState::error`]; nothing here returns an error
/// to the caller.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    store: Arc<dyn ClientStore>,
    chains: ChainRegistry,
    state: watch::Sender<WalletState>,
}

impl WalletSession {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, store: Arc<dyn ClientStore>, chains: ChainRegistry) -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self {
            provider,
            store,
            chains,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    fn fail(&self, err: &WalletError) {
        error!("Wallet error: {}", err);
        let message = err.user_message();
        self.state.send_modify(|s| {
            s.is_connecting = false;
            s.error = Some(message);
        });
    }

    fn reset(&self) {
        self.state.send_replace(WalletState::default());
    }

    /// Ask the wallet for accounts and adopt the first one
    pub async fn connect(&self) {
        let Some(provider) = self.provider.clone() else {
            self.fail(&WalletError::ProviderMissing);
            return;
        };

        self.state.send_modify(|s| {
            s.is_connecting = true;
            s.error = None;
        });

        let connected = async {
            let accounts = provider.request_accounts().await?;
            let address = *accounts.first().ok_or(WalletError::NoAccounts)?;
            let chain_id = provider.chain_id().await?;
            Ok::<_, WalletError>((address, chain_id))
        }
        .await;

        match connected {
            Ok((address, chain_id)) => {
                info!("Wallet connected: {} on chain {}", address, chain_id);
                self.state.send_modify(|s| {
                    s.address = Some(address);
                    s.chain_id = Some(chain_id);
                    s.is_connecting = false;
                });
                if let Err(e) = storage::mark_connected(self.store.as_ref()) {
                    warn!("Failed to persist wallet flag: {}", e);
                }
                self.update_balance(address).await;
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Forget the session and the persisted connected flag
    pub fn disconnect(&self) {
        info!("Wallet disconnected");
        self.reset();
        if let Err(e) = storage::clear_connected(self.store.as_ref()) {
            warn!("Failed to clear wallet flag: {}", e);
        }
    }

    /// Re-attach silently when the user connected in an earlier run
    pub async fn restore(&self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };
        if !storage::was_connected(self.store.as_ref()) {
            debug!("No previous wallet session");
            return;
        }

        let restored = async {
            let accounts = provider.accounts().await?;
            let Some(address) = accounts.first().copied() else {
                return Ok(None);
            };
            let chain_id = provider.chain_id().await?;
            Ok::<_, WalletError>(Some((address, chain_id)))
        }
        .await;

        match restored {
            Ok(Some((address, chain_id))) => {
                info!("Restored wallet session: {}", address);
                self.state.send_modify(|s| {
                    s.address = Some(address);
                    s.chain_id = Some(chain_id);
                });
                self.update_balance(address).await;
            }
            Ok(None) => debug!("Wallet has no authorized accounts"),
            Err(e) => warn!("Failed to restore wallet session: {}", e),
        }
    }

    /// Switch the wallet to `chain_id`, adding the chain first if the wallet lacks it
    pub async fn switch_network(&self, chain_id: u64) {
        let Some(provider) = self.provider.clone() else {
            self.fail(&WalletError::ProviderMissing);
            return;
        };

        let result = match provider.switch_chain(chain_id).await {
            Err(WalletError::UnrecognizedChain(_)) => match self.chains.get(chain_id) {
                Some(chain) => {
                    info!("Adding {} to the wallet", chain.name);
                    match provider.add_chain(chain).await {
                        Ok(()) => provider.switch_chain(chain_id).await,
                        Err(e) => Err(e),
                    }
                }
                None => Err(WalletError::UnrecognizedChain(chain_id)),
            },
            other => other,
        };

        match result {
            Ok(()) => {
                info!("Switched wallet to chain {}", chain_id);
                self.state.send_modify(|s| {
                    s.chain_id = Some(chain_id);
                    s.error = None;
                });
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Apply a wallet notification
    pub async fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    info!("Wallet locked or all accounts removed");
                    self.reset();
                }
                Some(address) => {
                    if self.state.borrow().address == Some(address) {
                        return;
                    }
                    info!("Active account changed: {}", address);
                    self.state.send_modify(|s| {
                        s.address = Some(address);
                        s.balance = None;
                    });
                    self.update_balance(address).await;
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                debug!("Chain changed: {}", chain_id);
                self.state.send_modify(|s| s.chain_id = Some(chain_id));
            }
            WalletEvent::Connect(chain_id) => {
                self.state.send_if_modified(|s| {
                    if s.is_connected() {
                        s.chain_id = Some(chain_id);
                        true
                    } else {
                        false
                    }
                });
            }
            WalletEvent::Disconnect => {
                warn!("Wallet provider disconnected");
                self.reset();
            }
        }
    }

    /// Feed provider events into [`Self::handle_event`] until the provider goes away
    pub fn listen(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let mut events = self.provider.as_ref()?.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} wallet events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    async fn update_balance(&self, address: Address) {
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        match provider.balance(&address).await {
            Ok(raw) => {
                let balance = format_units(raw, 18);
                // the account may have changed while we waited
                self.state.send_if_modified(|s| {
                    if s.address == Some(address) {
                        s.balance = Some(balance);
                        true
                    } else {
                        false
                    }
                });
            }
            Err(e) => warn!("Failed to fetch balance: {}", e),
        }
    }
}
