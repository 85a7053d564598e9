//! Mock data source for testing without network calls.

use super::{BalanceSource, DataSourceError, TransferSource};
use crate::domain::{Address, Decimal, RawTransfer, TransferHistory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock data source that returns predefined transfers and balances.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    transfers: Vec<RawTransfer>,
    malformed: usize,
    balances: HashMap<Address, Decimal>,
    failure: Option<DataSourceError>,
    transfer_fetches: Arc<AtomicUsize>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transfer to the mock data source.
    pub fn with_transfer(mut self, transfer: RawTransfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    /// Add multiple transfers to the mock data source.
    pub fn with_transfers(mut self, transfers: Vec<RawTransfer>) -> Self {
        self.transfers.extend(transfers);
        self
    }

    /// Report `count` undecodable rows alongside the transfers.
    pub fn with_malformed_rows(mut self, count: usize) -> Self {
        self.malformed = count;
        self
    }

    /// Set the balance returned for `wallet`.
    pub fn with_balance(mut self, wallet: Address, balance: Decimal) -> Self {
        self.balances.insert(wallet, balance);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_failure(mut self, error: DataSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// How many times `fetch_transfers` has been called, across clones.
    pub fn transfer_fetch_count(&self) -> usize {
        self.transfer_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferSource for MockDataSource {
    async fn fetch_transfers(&self, wallet: &Address) -> Result<TransferHistory, DataSourceError> {
        self.transfer_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        Ok(TransferHistory {
            transfers: self
                .transfers
                .iter()
                .filter(|t| t.from == *wallet || t.to == *wallet)
                .cloned()
                .collect(),
            malformed: self.malformed,
        })
    }
}

#[async_trait]
impl BalanceSource for MockDataSource {
    async fn fetch_balance(&self, wallet: &Address) -> Result<Decimal, DataSourceError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.balances.get(wallet).copied().unwrap_or_default())
    }
}
