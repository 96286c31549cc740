use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::models::{PriceMap, PriceQuote};

/// Streaming prices, authoritative over REST quotes when present
///
/// Every mutation bumps a version counter so the aggregator can react
/// without polling.
#[derive(Clone)]
pub struct RealtimePriceCache {
    prices: Arc<DashMap<String, PriceQuote>>,
    version: Arc<watch::Sender<u64>>,
}

impl RealtimePriceCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            prices: Arc::new(DashMap::new()),
            version: Arc::new(version),
        }
    }

    pub fn update(&self, id: &str, quote: PriceQuote) {
        self.prices.insert(id.to_string(), quote);
        self.version.send_modify(|v| *v += 1);
    }

    /// Drop every entry; done whenever the stream (re)connects
    pub fn clear(&self) {
        if self.prices.is_empty() {
            return;
        }
        self.prices.clear();
        self.version.send_modify(|v| *v += 1);
    }

    pub fn get(&self, id: &str) -> Option<PriceQuote> {
        self.prices.get(id).map(|entry| *entry.value())
    }

    /// Point-in-time copy of all entries
    pub fn snapshot(&self) -> PriceMap {
        self.prices
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for RealtimePriceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn updates_notify_subscribers() {
        let cache = RealtimePriceCache::new();
        let mut rx = cache.subscribe();

        cache.update("ethereum", PriceQuote::new(3000.0, 1.0));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(cache.get("ethereum"), Some(PriceQuote::new(3000.0, 1.0)));

        cache.clear();
        rx.changed().await.unwrap();
        assert!(cache.is_empty());
    }
}
