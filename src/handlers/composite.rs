use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::error::AggregateError;
use crate::models::PortfolioSnapshot;
use crate::traits::event_handler::{PortfolioEventHandler, UpdateTrigger};

/// Fans every event out to a set of handlers, concurrently
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Arc<dyn PortfolioEventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: Arc<dyn PortfolioEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_handler(&mut self, handler: Arc<dyn PortfolioEventHandler>) {
        self.handlers.push(handler);
    }
}

#[async_trait]
impl PortfolioEventHandler for CompositeEventHandler {
    async fn handle_snapshot(&self, snapshot: Arc<PortfolioSnapshot>, trigger: UpdateTrigger) {
        join_all(
            self.handlers
                .iter()
                .map(|handler| handler.handle_snapshot(snapshot.clone(), trigger)),
        )
        .await;
    }

    async fn handle_error(&self, error: &AggregateError) {
        join_all(self.handlers.iter().map(|handler| handler.handle_error(error))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BalanceError;
    use crate::models::PriceMap;
    use crate::tracker::merge::{build_snapshot, SnapshotInputs};
    use alloy::primitives::Address;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        snapshots: AtomicUsize,
        errors: AtomicUsize,
    }

    #[async_trait]
    impl PortfolioEventHandler for Counter {
        async fn handle_snapshot(&self, _snapshot: Arc<PortfolioSnapshot>, _trigger: UpdateTrigger) {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
        }

        async fn handle_error(&self, _error: &AggregateError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn every_handler_sees_every_event() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let composite = CompositeEventHandler::new().with(first.clone()).with(second.clone());

        let inputs = SnapshotInputs {
            wallet: Address::ZERO,
            chain_id: 1,
            balances: Vec::new(),
            rest_prices: PriceMap::new(),
            positions: Vec::new(),
        };
        let snapshot = Arc::new(build_snapshot(&inputs, &PriceMap::new(), 0.0001, Utc::now()));
        composite.handle_snapshot(snapshot, UpdateTrigger::Refresh).await;
        composite
            .handle_error(&AggregateError::balances(&BalanceError::UnsupportedChain(56)))
            .await;

        for counter in [&first, &second] {
            assert_eq!(counter.snapshots.load(Ordering::SeqCst), 1);
            assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
        }
    }
}
