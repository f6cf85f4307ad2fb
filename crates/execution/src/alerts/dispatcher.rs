//! Single consumer of the notification queue.

use super::{Notification, Notifier};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Delivery counters reported when the dispatcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Drains the queue in order into a [`Notifier`].
pub struct NotificationDispatcher {
    notifier: Box<dyn Notifier>,
    rx: mpsc::Receiver<Notification>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Box<dyn Notifier>, rx: mpsc::Receiver<Notification>) -> Self {
        Self { notifier, rx }
    }

    /// Runs until every sender has been dropped and the queue is empty.
    ///
    /// A failed delivery is logged and the next message is processed.
    pub async fn run(mut self) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(notification) = self.rx.recv().await {
            match self.notifier.notify(&notification).await {
                Ok(()) => {
                    stats.delivered += 1;
                    debug!(delivered = stats.delivered, "Notification delivered");
                }
                Err(e) => {
                    stats.failed += 1;
                    error!(error = %e, "Failed to deliver notification");
                }
            }
        }
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Notification dispatcher stopped"
        );
        stats
    }
}
