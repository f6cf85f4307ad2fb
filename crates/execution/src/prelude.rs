//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use hl_watch_execution::prelude::*;
//! ```

// Alerts
pub use crate::alerts::{
    ConsoleNotifier, DispatchStats, Notification, NotificationDispatcher, NotificationSender,
    Notifier, NotifyError, TelegramNotifier, TextFormat, notification_channel,
};

// Monitor
pub use crate::monitor::{
    MonitorConfig, MonitorContext, MonitorError, RetryConfig, Supervisor, WalletMonitor,
    WalletSession,
};

// Sync
pub use crate::sync::{
    BackoffConfig, ConnectionState, ReconnectBackoff, StreamConfig, StreamError, StreamHandler,
    StreamMessage, UserEventStream,
};
