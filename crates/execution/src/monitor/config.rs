//! Monitor configuration.

use crate::sync::StreamConfig;
use std::time::Duration;

/// Bounded retry of snapshot fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Wait before the second attempt; doubles after each further failure.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Settings shared by every wallet monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub stream: StreamConfig,
    /// Wait between receiving fills and re-fetching, so the venue's state
    /// reflects them.
    pub settle_delay: Duration,
    pub fetch_retry: RetryConfig,
    /// Wait before the first restart of a crashed monitor. Doubles for each
    /// further crash in a row.
    pub restart_delay: Duration,
    /// Cap of the restart wait. A monitor that stayed up this long before
    /// crashing starts a new crash streak.
    pub max_restart_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            settle_delay: Duration::from_secs(1),
            fetch_retry: RetryConfig::default(),
            restart_delay: Duration::from_secs(5),
            max_restart_delay: Duration::from_secs(300),
        }
    }
}
