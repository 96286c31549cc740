use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AggregateError;
use crate::models::PortfolioSnapshot;

/// What produced a published snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTrigger {
    Refresh,
    Realtime,
}

/// Handler for published portfolio state
#[async_trait]
pub trait PortfolioEventHandler: Send + Sync {
    /// Handle a new snapshot
    async fn handle_snapshot(&self, snapshot: Arc<PortfolioSnapshot>, trigger: UpdateTrigger);

    /// Handle a failed refresh cycle
    async fn handle_error(&self, error: &AggregateError);
}
