//! Checkpoint repository for per-wallet position snapshots.

use crate::CheckpointStore;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hl_watch_domain::{Position, PositionSnapshot};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::debug;

/// Database record for one persisted position.
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    /// Wallet address.
    pub wallet: String,
    /// Coin identifier.
    pub coin: String,
    /// Serialized position.
    pub data: String,
}

impl CheckpointRecord {
    /// Creates a CheckpointRecord from a database row.
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            wallet: row.try_get("wallet")?,
            coin: row.try_get("coin")?,
            data: row.try_get("data")?,
        })
    }

    fn into_position(self) -> Result<Position, StoreError> {
        let position: Position = serde_json::from_str(&self.data)?;
        if position.coin != self.coin {
            return Err(StoreError::CorruptRow {
                wallet: self.wallet,
                row_coin: self.coin,
                data_coin: position.coin,
            });
        }
        Ok(position)
    }
}

/// A wallet's persisted snapshot together with when it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub wallet: String,
    pub saved_at: DateTime<Utc>,
    pub snapshot: PositionSnapshot,
}

/// Repository for checkpoint persistence.
#[derive(Clone)]
pub struct CheckpointRepository {
    pool: Arc<SqlitePool>,
}

impl CheckpointRepository {
    /// Creates a new CheckpointRepository.
    #[must_use]
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Loads a wallet's checkpoint with its save time.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn load_checkpoint(&self, wallet: &str) -> Result<Option<Checkpoint>, StoreError> {
        let marker = sqlx::query("SELECT saved_at FROM checkpoint_wallets WHERE wallet = ?")
            .bind(wallet)
            .fetch_optional(self.pool.as_ref())
            .await?;
        let Some(marker) = marker else {
            return Ok(None);
        };
        let saved_at: DateTime<Utc> = marker.try_get("saved_at")?;

        let rows = sqlx::query("SELECT wallet, coin, data FROM checkpoints WHERE wallet = ?")
            .bind(wallet)
            .fetch_all(self.pool.as_ref())
            .await?;

        let mut snapshot = PositionSnapshot::new();
        for row in &rows {
            snapshot.insert(CheckpointRecord::from_row(row)?.into_position()?);
        }

        Ok(Some(Checkpoint {
            wallet: wallet.to_string(),
            saved_at,
            snapshot,
        }))
    }

    /// Replaces a wallet's checkpoint inside one transaction.
    ///
    /// # Errors
    /// Returns an error if any statement fails; the previous checkpoint is
    /// then left untouched.
    pub async fn replace(&self, wallet: &str, snapshot: &PositionSnapshot) -> Result<(), StoreError> {
        let mut rows = Vec::with_capacity(snapshot.len());
        for position in snapshot.iter() {
            rows.push((position.coin.as_str(), serde_json::to_string(position)?));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM checkpoints WHERE wallet = ?")
            .bind(wallet)
            .execute(&mut *tx)
            .await?;

        for (coin, data) in &rows {
            sqlx::query("INSERT INTO checkpoints (wallet, coin, data) VALUES (?, ?, ?)")
                .bind(wallet)
                .bind(coin)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO checkpoint_wallets (wallet, saved_at)
            VALUES (?, ?)
            ON CONFLICT (wallet) DO UPDATE SET saved_at = EXCLUDED.saved_at
            "#,
        )
        .bind(wallet)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(wallet = wallet, positions = rows.len(), "Checkpoint saved");
        Ok(())
    }

    /// Deletes a wallet's checkpoint.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete(&self, wallet: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let positions = sqlx::query("DELETE FROM checkpoints WHERE wallet = ?")
            .bind(wallet)
            .execute(&mut *tx)
            .await?;
        let marker = sqlx::query("DELETE FROM checkpoint_wallets WHERE wallet = ?")
            .bind(wallet)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(positions.rows_affected() + marker.rows_affected() > 0)
    }

    /// Lists every wallet that currently has a checkpoint.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn wallets(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT wallet FROM checkpoint_wallets ORDER BY wallet")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get("wallet"))
            .collect::<Result<Vec<String>, sqlx::Error>>()?)
    }
}

#[async_trait]
impl CheckpointStore for CheckpointRepository {
    async fn save(&self, wallet: &str, snapshot: &PositionSnapshot) -> Result<(), StoreError> {
        self.replace(wallet, snapshot).await
    }

    async fn load(&self, wallet: &str) -> Result<Option<PositionSnapshot>, StoreError> {
        Ok(self.load_checkpoint(wallet).await?.map(|c| c.snapshot))
    }

    async fn clear(&self, wallet: &str) -> Result<(), StoreError> {
        self.delete(wallet).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Database;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0xtest1234567890";

    async fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("state.db")).await.unwrap();
        db.migrate().await.unwrap();
        (dir, db)
    }

    fn position(coin: &str, signed_size: Decimal, entry: Decimal) -> Position {
        Position::from_signed_size(coin, signed_size, entry, dec!(10), dec!(100), dec!(0.05))
            .unwrap()
    }

    fn snapshot(positions: Vec<Position>) -> PositionSnapshot {
        positions.into_iter().collect()
    }

    #[tokio::test]
    async fn test_load_without_checkpoint() {
        let (_dir, db) = setup().await;
        assert!(db.checkpoints().load(WALLET).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();
        let saved = snapshot(vec![
            position("ETH", dec!(1.5), dec!(3000)),
            position("BTC", dec!(-0.5), dec!(95000.25)),
        ]);

        repo.save(WALLET, &saved).await.unwrap();
        let loaded = repo.load(WALLET).await.unwrap().unwrap();

        assert_eq!(loaded, saved);
        assert_eq!(loaded.get("BTC").unwrap().entry_price, dec!(95000.25));
    }

    #[tokio::test]
    async fn test_saved_empty_snapshot_is_not_missing() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();

        repo.save(WALLET, &PositionSnapshot::new()).await.unwrap();
        let loaded = repo.load(WALLET).await.unwrap();

        assert_eq!(loaded, Some(PositionSnapshot::new()));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();

        repo.save(WALLET, &snapshot(vec![position("ETH", dec!(1), dec!(3000))]))
            .await
            .unwrap();
        repo.save(WALLET, &snapshot(vec![position("BTC", dec!(1), dec!(90000))]))
            .await
            .unwrap();

        let loaded = repo.load(WALLET).await.unwrap().unwrap();
        assert_eq!(loaded.coins().collect::<Vec<_>>(), vec!["BTC"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();

        repo.save(WALLET, &snapshot(vec![position("ETH", dec!(1), dec!(3000))]))
            .await
            .unwrap();
        repo.clear(WALLET).await.unwrap();

        assert!(repo.load(WALLET).await.unwrap().is_none());
        assert!(repo.wallets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multiple_wallets() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();
        let wallet_a = "0xAAAA";
        let wallet_b = "0xBBBB";

        repo.save(wallet_a, &snapshot(vec![position("ETH", dec!(1), dec!(3000))]))
            .await
            .unwrap();
        repo.save(wallet_b, &snapshot(vec![position("BTC", dec!(1), dec!(90000))]))
            .await
            .unwrap();

        let loaded_a = repo.load(wallet_a).await.unwrap().unwrap();
        let loaded_b = repo.load(wallet_b).await.unwrap().unwrap();
        assert_eq!(loaded_a.coins().collect::<Vec<_>>(), vec!["ETH"]);
        assert_eq!(loaded_b.coins().collect::<Vec<_>>(), vec!["BTC"]);

        repo.save(wallet_a, &PositionSnapshot::new()).await.unwrap();
        repo.clear(wallet_a).await.unwrap();
        assert!(repo.load(wallet_a).await.unwrap().is_none());
        assert_eq!(repo.load(wallet_b).await.unwrap().unwrap(), loaded_b);
        assert_eq!(repo.wallets().await.unwrap(), vec![wallet_b.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_checkpoint() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();
        let previous = snapshot(vec![
            position("ETH", dec!(1), dec!(3000)),
            position("SOL", dec!(20), dec!(150)),
        ]);
        repo.save(WALLET, &previous).await.unwrap();

        sqlx::raw_sql(
            "CREATE TRIGGER reject_bad BEFORE INSERT ON checkpoints \
             WHEN NEW.coin = 'BAD' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let broken = snapshot(vec![
            position("AAA", dec!(1), dec!(1)),
            position("BAD", dec!(1), dec!(1)),
        ]);
        assert!(repo.save(WALLET, &broken).await.is_err());

        let loaded = repo.load(WALLET).await.unwrap().unwrap();
        assert_eq!(loaded, previous);
    }

    #[tokio::test]
    async fn test_checkpoint_reports_save_time() {
        let (_dir, db) = setup().await;
        let repo = db.checkpoints();
        let before = Utc::now();

        repo.save(WALLET, &PositionSnapshot::new()).await.unwrap();
        let checkpoint = repo.load_checkpoint(WALLET).await.unwrap().unwrap();

        assert_eq!(checkpoint.wallet, WALLET);
        assert!(checkpoint.saved_at >= before - chrono::TimeDelta::seconds(1));
    }
}
