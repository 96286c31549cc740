use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::BalanceError;
use crate::models::{ChainRegistry, RawBalance};
use crate::traits::data_provider::BalanceProvider;
use crate::utils::helper::format_units;

/// Reads the configured token list of a chain for one wallet
pub struct ChainBalanceReader {
    provider: Arc<dyn BalanceProvider>,
    chains: ChainRegistry,
}

impl ChainBalanceReader {
    pub fn new(provider: Arc<dyn BalanceProvider>, chains: ChainRegistry) -> Self {
        Self { provider, chains }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// One record per configured token; a failing token reads as zero
    pub async fn read_balances(&self, wallet: &Address, chain_id: u64) -> Result<Vec<RawBalance>, BalanceError> {
        let chain = self
            .chains
            .get(chain_id)
            .ok_or(BalanceError::UnsupportedChain(chain_id))?;
        reqwest::Url::parse(&chain.rpc_url)
            .map_err(|e| BalanceError::Rpc(format!("bad endpoint {} for {}: {}", chain.rpc_url, chain.name, e)))?;

        let reads = chain.all_tokens().into_iter().map(|token| async move {
            let result = if token.is_native() {
                self.provider.fetch_native_balance(chain, wallet).await
            } else {
                self.provider.fetch_token_balance(chain, &token, wallet).await
            };

            match result {
                Ok(raw) => {
                    let balance = format_units(raw, token.decimals);
                    debug!("{} balance on {}: {}", token.symbol, chain.name, balance);
                    RawBalance::new(token, balance)
                }
                Err(e) => {
                    warn!("Failed to read {} balance on {}: {}", token.symbol, chain.name, e);
                    RawBalance::zero(token)
                }
            }
        });

        Ok(join_all(reads).await)
    }
}
