//! Outbound notifications.
//!
//! Wallet monitors push [`Notification`]s into a bounded queue; a single
//! [`NotificationDispatcher`] drains it in order and hands each message to a
//! [`Notifier`].

mod dispatcher;
pub mod format;
mod notifier;

pub use dispatcher::{DispatchStats, NotificationDispatcher};
pub use notifier::{ConsoleNotifier, Notifier, NotifyError, TelegramNotifier};

use tokio::sync::mpsc;
use tracing::warn;

/// Rich-format hint for the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Html,
}

/// One message for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub format: Option<TextFormat>,
}

impl Notification {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: Some(TextFormat::Html),
        }
    }
}

/// Producer half of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// Enqueues a notification, waiting for room if the queue is full.
    ///
    /// Returns `false` if the consumer is gone.
    pub async fn send(&self, notification: Notification) -> bool {
        if self.tx.send(notification).await.is_err() {
            warn!("Notification queue closed, dropping message");
            return false;
        }
        true
    }
}

/// Creates the notification queue.
pub fn notification_channel(capacity: usize) -> (NotificationSender, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity);
    (NotificationSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_preserves_order() {
        let (sender, mut rx) = notification_channel(8);
        for i in 0..5 {
            assert!(sender.send(Notification::plain(format!("msg {i}"))).await);
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap().text, format!("msg {i}"));
        }
    }

    #[tokio::test]
    async fn test_send_after_consumer_dropped() {
        let (sender, rx) = notification_channel(1);
        drop(rx);
        assert!(!sender.send(Notification::html("<b>late</b>")).await);
    }
}
