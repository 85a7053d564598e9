//! Incremental per-wallet principal ledger.
//!
//! Driven by application deposit/withdraw events, never by transfer history. Mutations for the
//! same wallet are serialized through a per-wallet async lock so that concurrent
//! read-modify-write cycles cannot lose updates. Different wallets never contend.

use crate::domain::{Address, Decimal, DepositRecord, TimeSec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(String),
    #[error("invalid ledger amount: {0}")]
    InvalidAmount(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Persistence for deposit records.
#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
    async fn load(&self, wallet: &Address) -> Result<Option<DepositRecord>, LedgerError>;
    async fn save(&self, record: &DepositRecord) -> Result<(), LedgerError>;
}

/// Process-local store, used in tests and when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    records: RwLock<HashMap<Address, DepositRecord>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load(&self, wallet: &Address) -> Result<Option<DepositRecord>, LedgerError> {
        Ok(self.records.read().await.get(wallet).cloned())
    }

    async fn save(&self, record: &DepositRecord) -> Result<(), LedgerError> {
        self.records
            .write()
            .await
            .insert(record.wallet.clone(), record.clone());
        Ok(())
    }
}

/// Deposit ledger over any [`LedgerStore`].
#[derive(Debug)]
pub struct DepositLedger {
    store: Arc<dyn LedgerStore>,
    locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl DepositLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn wallet_lock(&self, wallet: &Address) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(wallet.clone()).or_default().clone()
    }

    /// Drop the wallet's lock entry once no other task holds or waits on it.
    async fn release_wallet_lock(&self, wallet: &Address, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(wallet);
        }
    }

    /// `totalDeposited += amount`. Negative amounts and amounts above
    /// [`Decimal::max_amount`] are rejected.
    pub async fn record_deposit(
        &self,
        wallet: &Address,
        amount: Decimal,
    ) -> Result<DepositRecord, LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "deposit amount must not be negative, got {}",
                amount
            )));
        }
        if !amount.is_within_amount_bounds() {
            return Err(LedgerError::InvalidAmount(format!(
                "deposit amount {} exceeds {}",
                amount,
                Decimal::max_amount()
            )));
        }

        let lock = self.wallet_lock(wallet).await;
        let result = {
            let _guard = lock.lock().await;
            self.deposit_locked(wallet, amount).await
        };
        self.release_wallet_lock(wallet, lock).await;
        let record = result?;

        debug!(
            wallet = %wallet.as_str(),
            amount = %amount,
            total = %record.total_deposited,
            "recorded deposit"
        );
        Ok(record)
    }

    /// Reduce principal by the share of total value that was withdrawn.
    pub async fn record_withdrawal(
        &self,
        wallet: &Address,
        withdrawn_value: Decimal,
        total_value_before: Decimal,
    ) -> Result<DepositRecord, LedgerError> {
        if withdrawn_value.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "withdrawn value must not be negative, got {}",
                withdrawn_value
            )));
        }

        let lock = self.wallet_lock(wallet).await;
        let result = {
            let _guard = lock.lock().await;
            self.withdraw_locked(wallet, withdrawn_value, total_value_before)
                .await
        };
        self.release_wallet_lock(wallet, lock).await;
        let record = result?;

        debug!(
            wallet = %wallet.as_str(),
            withdrawn = %withdrawn_value,
            value_before = %total_value_before,
            total = %record.total_deposited,
            "recorded withdrawal"
        );
        Ok(record)
    }

    async fn deposit_locked(
        &self,
        wallet: &Address,
        amount: Decimal,
    ) -> Result<DepositRecord, LedgerError> {
        let now = TimeSec::now();
        let mut record = self.load_or_empty(wallet, now).await?;
        record.apply_deposit(amount, now).map_err(|e| {
            LedgerError::InvalidAmount(format!(
                "{}: {} + {}",
                e, record.total_deposited, amount
            ))
        })?;
        self.store.save(&record).await?;
        Ok(record)
    }

    async fn withdraw_locked(
        &self,
        wallet: &Address,
        withdrawn_value: Decimal,
        total_value_before: Decimal,
    ) -> Result<DepositRecord, LedgerError> {
        let now = TimeSec::now();
        let mut record = self.load_or_empty(wallet, now).await?;
        record.apply_withdrawal(withdrawn_value, total_value_before, now);
        self.store.save(&record).await?;
        Ok(record)
    }

    /// Current total; zero for a wallet the ledger has never seen.
    pub async fn get_total_deposited(&self, wallet: &Address) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .load(wallet)
            .await?
            .map(|r| r.total_deposited)
            .unwrap_or_default())
    }

    pub async fn get_record(&self, wallet: &Address) -> Result<Option<DepositRecord>, LedgerError> {
        self.store.load(wallet).await
    }

    async fn load_or_empty(
        &self,
        wallet: &Address,
        now: TimeSec,
    ) -> Result<DepositRecord, LedgerError> {
        Ok(self
            .store
            .load(wallet)
            .await?
            .unwrap_or_else(|| DepositRecord::empty(wallet.clone(), now)))
    }
}
