use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::AggregateError;
use crate::models::PortfolioSnapshot;
use crate::traits::event_handler::{PortfolioEventHandler, UpdateTrigger};
use crate::utils::helper::{format_address, format_currency, format_percentage};

/// Console logging event handler
pub struct ConsoleEventHandler;

impl ConsoleEventHandler {
    /// Create a new console event handler
    pub fn new() -> Self {
        Self
    }

    fn log_summary(snapshot: &PortfolioSnapshot) {
        info!("Portfolio {} on chain {}", format_address(&snapshot.wallet_address), snapshot.chain_id);
        info!("{}", "-".repeat(80));
        info!(
            "  Total: {} ({} / {} 24h)",
            format_currency(snapshot.total_value),
            format_currency(snapshot.change_24h_value),
            format_percentage(snapshot.change_24h_pct)
        );
        info!(
            "  Wallet: {} | DeFi: {}",
            format_currency(snapshot.wallet_value()),
            format_currency(snapshot.defi_value())
        );

        for balance in &snapshot.balances {
            info!(
                "  {:<16} @ {:<10} = {:<10} {}",
                balance.formatted_amount(),
                format_currency(balance.price),
                format_currency(balance.value),
                format_percentage(balance.price_change_24h)
            );
        }

        if !snapshot.positions.is_empty() {
            info!("  DeFi positions:");
            for position in &snapshot.positions {
                let apy = position
                    .apy
                    .map(|apy| format!("{:.1}% APY", apy))
                    .unwrap_or_else(|| "-".to_string());
                info!(
                    "    {} {:?}: {} ({})",
                    position.protocol,
                    position.kind,
                    format_currency(position.total_value),
                    apy
                );
            }
        }

        let analytics = &snapshot.analytics;
        let best = analytics
            .best_performer
            .as_ref()
            .map(|b| format!("{} {}", b.symbol, format_percentage(b.price_change_24h)))
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            "  Best: {} | Yield: {:.2}% | Risk: {:.0} | Diversification: {:.0}",
            best, analytics.weighted_yield, analytics.risk_score, analytics.diversification
        );
        info!("{}", "=".repeat(80));
    }
}

impl Default for ConsoleEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortfolioEventHandler for ConsoleEventHandler {
    async fn handle_snapshot(&self, snapshot: Arc<PortfolioSnapshot>, trigger: UpdateTrigger) {
        match trigger {
            UpdateTrigger::Refresh => Self::log_summary(&snapshot),
            UpdateTrigger::Realtime => debug!(
                "Realtime update: {} ({})",
                format_currency(snapshot.total_value),
                format_percentage(snapshot.change_24h_pct)
            ),
        }
    }

    async fn handle_error(&self, error: &AggregateError) {
        match error.retry_after {
            Some(after) => warn!("Portfolio tracker error: {} (retry in {}s)", error, after.as_secs()),
            None => warn!("Portfolio tracker error: {}", error),
        }
    }
}
