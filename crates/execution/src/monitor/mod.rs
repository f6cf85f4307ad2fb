//! Per-wallet monitoring.
//!
//! A [`WalletMonitor`] reconciles a wallet against its checkpoint on start,
//! then follows the wallet's user event stream. The [`Supervisor`] runs one
//! monitor per wallet and restarts any that fail.

mod config;
mod supervisor;
mod wallet_monitor;

pub use config::*;
pub use supervisor::*;
pub use wallet_monitor::*;

use hl_watch_data::FetchError;
use thiserror::Error;

/// Failure that ends a monitor run. The supervisor restarts the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Startup was still waiting for the live snapshot.
    #[error("initial snapshot fetch failed for {wallet}: {source}")]
    StartupFetch {
        wallet: String,
        #[source]
        source: FetchError,
    },
}
