//! Data access for the wallet position watcher.
//!
//! - [`providers`]: request/response clients for the venue's info endpoint
//! - [`repositories`]: SQLite persistence of per-wallet checkpoints
//!
//! The [`SnapshotProvider`] and [`CheckpointStore`] traits are the seams the
//! monitor is written against.

pub mod error;
pub mod providers;
pub mod repositories;

pub use error::{FetchError, StoreError};

use async_trait::async_trait;
use hl_watch_domain::PositionSnapshot;

/// Source of live position snapshots.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetches every open position of `wallet`.
    ///
    /// # Errors
    /// Any failure is a [`FetchError`]; callers treat it as transient.
    async fn fetch_positions(&self, wallet: &str) -> Result<PositionSnapshot, FetchError>;
}

/// Durable last-known snapshot per wallet.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Replaces the wallet's checkpoint with `snapshot` as one unit.
    async fn save(&self, wallet: &str, snapshot: &PositionSnapshot) -> Result<(), StoreError>;

    /// Returns `Ok(None)` when the wallet has never been checkpointed (or was
    /// cleared), and `Ok(Some(empty))` when the last saved snapshot was empty.
    async fn load(&self, wallet: &str) -> Result<Option<PositionSnapshot>, StoreError>;

    /// Removes the wallet's checkpoint.
    async fn clear(&self, wallet: &str) -> Result<(), StoreError>;
}
