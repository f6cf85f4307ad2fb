//! SQLite persistence.
//!
//! Checkpoints live in a single SQLite file shared by every wallet monitor.

mod checkpoint_repository;

pub use checkpoint_repository::{Checkpoint, CheckpointRecord, CheckpointRepository};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;

/// Shared SQLite pool handed out to repositories.
#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Opens (creating if missing) the SQLite database at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Underlying pool, for shutdown and ad-hoc queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checkpoint repository sharing this pool.
    #[must_use]
    pub fn checkpoints(&self) -> CheckpointRepository {
        CheckpointRepository::new(self.pool.clone())
    }

    /// Creates the checkpoint tables if they do not exist.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(include_str!("../../migrations/001_checkpoints.sql"))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
