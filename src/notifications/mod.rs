use std::sync::Arc;

use tokio::sync::mpsc::{error::TryRecvError, unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use crate::error::AggregateError;
use crate::models::PortfolioSnapshot;
use crate::traits::event_handler::{PortfolioEventHandler, UpdateTrigger};

/// Notification types
#[derive(Debug, Clone)]
pub enum Notification {
    Snapshot(Arc<PortfolioSnapshot>, UpdateTrigger),
    Error(AggregateError),
    Shutdown,
}

/// Notification queue for async processing
///
/// Handlers run on their own task. Realtime patches that pile up behind a
/// slow handler are collapsed to the newest one.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Create a new notification queue
    pub fn new(handler: Arc<dyn PortfolioEventHandler>) -> Self {
        let (sender, receiver) = unbounded_channel();

        tokio::spawn(Self::process_notifications(receiver, handler));

        Self { sender }
    }

    async fn process_notifications(
        mut receiver: UnboundedReceiver<Notification>,
        handler: Arc<dyn PortfolioEventHandler>,
    ) {
        let mut pending: Option<Notification> = None;

        loop {
            let notification = match pending.take() {
                Some(n) => n,
                None => match receiver.recv().await {
                    Some(n) => n,
                    None => break,
                },
            };

            match notification {
                Notification::Snapshot(snapshot, UpdateTrigger::Realtime) => {
                    let mut latest = snapshot;
                    let mut skipped = 0usize;
                    loop {
                        match receiver.try_recv() {
                            Ok(Notification::Snapshot(next, UpdateTrigger::Realtime)) => {
                                latest = next;
                                skipped += 1;
                            }
                            Ok(other) => {
                                pending = Some(other);
                                break;
                            }
                            Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                        }
                    }
                    if skipped > 0 {
                        debug!("Collapsed {} realtime updates", skipped);
                    }
                    handler.handle_snapshot(latest, UpdateTrigger::Realtime).await;
                }
                Notification::Snapshot(snapshot, trigger) => {
                    handler.handle_snapshot(snapshot, trigger).await;
                }
                Notification::Error(err) => {
                    handler.handle_error(&err).await;
                }
                Notification::Shutdown => {
                    warn!("Notification processor shutting down");
                    break;
                }
            }
        }
    }

    /// Queue a snapshot notification (non-blocking)
    pub fn notify_snapshot(&self, snapshot: Arc<PortfolioSnapshot>, trigger: UpdateTrigger) {
        if let Err(e) = self.sender.send(Notification::Snapshot(snapshot, trigger)) {
            error!("Failed to queue snapshot notification: {}", e);
        }
    }

    /// Queue an error notification (non-blocking)
    pub fn notify_error(&self, error: &AggregateError) {
        if let Err(e) = self.sender.send(Notification::Error(error.clone())) {
            error!("Failed to queue error notification: {}", e);
        }
    }

    /// Stop the processing task once queued notifications are handled
    pub fn shutdown(&self) {
        let _ = self.sender.send(Notification::Shutdown);
    }
}
