//! Repository layer for deposit record persistence.

use crate::domain::{Address, Decimal, DepositRecord, TimeSec};
use crate::ledger::{LedgerError, LedgerStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Insert or replace the record for `record.wallet`.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_deposit_record(&self, record: &DepositRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO deposit_records (wallet, total_deposited, last_updated, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(wallet) DO UPDATE SET
                total_deposited = excluded.total_deposited,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(record.wallet.as_str())
        .bind(record.total_deposited.to_canonical_string())
        .bind(record.last_updated.as_secs())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the record for a wallet, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_deposit_record(
        &self,
        wallet: &Address,
    ) -> Result<Option<DepositRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT wallet, total_deposited, last_updated
            FROM deposit_records
            WHERE wallet = ?
            "#,
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let wallet: String = row.get("wallet");
            let total_str: String = row.get("total_deposited");
            let last_updated: i64 = row.get("last_updated");

            // Unreadable or negative totals read as zero.
            let total_deposited = Decimal::from_str(&total_str)
                .unwrap_or_else(|e| {
                    warn!(
                        wallet = %wallet,
                        total = %total_str,
                        error = %e,
                        "Failed to parse total_deposited decimal, using zero"
                    );
                    Decimal::zero()
                })
                .non_negative();

            DepositRecord {
                wallet: Address::new(wallet),
                total_deposited,
                last_updated: TimeSec::new(last_updated),
            }
        }))
    }
}

#[async_trait]
impl LedgerStore for Repository {
    async fn load(&self, wallet: &Address) -> Result<Option<DepositRecord>, LedgerError> {
        Ok(self.get_deposit_record(wallet).await?)
    }

    async fn save(&self, record: &DepositRecord) -> Result<(), LedgerError> {
        Ok(self.upsert_deposit_record(record).await?)
    }
}
