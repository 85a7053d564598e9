use crate::cache::SummaryCache;
use crate::datasource::{BalanceSource, DataSourceError, TransferSource};
use crate::domain::{Address, Decimal, DepositRecord};
use crate::engine::{analyze, AnalysisInput, AnalysisSettings, ClassifierContext, WalletReport};
use crate::ledger::{DepositLedger, LedgerError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Fetches a wallet snapshot from the collaborators and runs the engine pipeline over it.
///
/// Reports are cached per wallet; ledger writes through this type invalidate the cached entry.
/// A report whose computation overlapped a ledger write is returned but not cached.
#[derive(Debug, Clone)]
pub struct Analyzer {
    transfers: Arc<dyn TransferSource>,
    balances: Arc<dyn BalanceSource>,
    ledger: Arc<DepositLedger>,
    cache: Arc<dyn SummaryCache>,
    /// Bumped after every ledger write. Cache inserts and invalidations happen under this lock.
    write_epoch: Arc<Mutex<u64>>,
    /// Address context; `wallet` is replaced per request.
    addresses: ClassifierContext,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(
        transfers: Arc<dyn TransferSource>,
        balances: Arc<dyn BalanceSource>,
        ledger: Arc<DepositLedger>,
        cache: Arc<dyn SummaryCache>,
        addresses: ClassifierContext,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            transfers,
            balances,
            ledger,
            cache,
            write_epoch: Arc::new(Mutex::new(0)),
            addresses,
            settings,
        }
    }

    pub fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    /// Cached report for `wallet`, computing it on a miss.
    pub async fn report(&self, wallet: &Address) -> Result<Arc<WalletReport>, AnalysisError> {
        if let Some(report) = self.cache.get(wallet).await {
            debug!(wallet = %wallet.as_str(), "summary cache hit");
            return Ok(report);
        }

        let epoch = *self.write_epoch.lock().await;
        let report = Arc::new(self.compute(wallet).await?);

        let current = self.write_epoch.lock().await;
        if *current == epoch {
            self.cache.put(wallet.clone(), report.clone()).await;
        } else {
            debug!(wallet = %wallet.as_str(), "ledger changed during analysis, not caching");
        }
        Ok(report)
    }

    /// Run the pipeline against freshly fetched data, bypassing the cache.
    pub async fn compute(&self, wallet: &Address) -> Result<WalletReport, AnalysisError> {
        let (history, balance) = futures::try_join!(
            self.transfers.fetch_transfers(wallet),
            self.balances.fetch_balance(wallet),
        )?;
        let ledger_total = self.ledger.get_total_deposited(wallet).await?;

        let context = ClassifierContext {
            wallet: wallet.clone(),
            ..self.addresses.clone()
        };
        let report = analyze(
            AnalysisInput {
                transfers: &history.transfers,
                malformed_rows: history.malformed,
                context: &context,
                current_balance: balance,
                ledger_total,
            },
            &self.settings,
        );

        log_report(&report);
        Ok(report)
    }

    pub async fn record_deposit(
        &self,
        wallet: &Address,
        amount: Decimal,
    ) -> Result<DepositRecord, AnalysisError> {
        let record = self.ledger.record_deposit(wallet, amount).await?;
        self.ledger_written(wallet).await;
        Ok(record)
    }

    pub async fn record_withdrawal(
        &self,
        wallet: &Address,
        withdrawn_value: Decimal,
        total_value_before: Decimal,
    ) -> Result<DepositRecord, AnalysisError> {
        let record = self
            .ledger
            .record_withdrawal(wallet, withdrawn_value, total_value_before)
            .await?;
        self.ledger_written(wallet).await;
        Ok(record)
    }

    async fn ledger_written(&self, wallet: &Address) {
        let mut epoch = self.write_epoch.lock().await;
        *epoch = epoch.wrapping_add(1);
        self.cache.invalidate(wallet).await;
    }
}

fn log_report(report: &WalletReport) {
    let wallet = report.wallet.as_str();
    debug!(
        wallet = %wallet,
        classified = report.summary.transaction_count,
        skipped_zero = report.skipped.zero_value,
        skipped_unparsable = report.skipped.unparsable,
        skipped_out_of_range = report.skipped.out_of_range,
        skipped_internal = report.skipped.internal,
        skipped_malformed = report.skipped.malformed,
        fees_exact = report.fee_matching.exact_matches,
        fees_window = report.fee_matching.window_matches,
        fees_reclassified = report.fee_matching.reclassified,
        "classified transfers"
    );

    info!(
        wallet = %wallet,
        rule = ?report.invested.rule,
        source = ?report.invested.source,
        amount_invested = %report.invested.amount_invested,
        history = ?report.invested.history_value.map(|d| d.to_canonical_string()),
        ledger = %report.invested.ledger_value,
        "resolved amount invested"
    );

    for (name, check) in report.checks.failures() {
        warn!(
            wallet = %wallet,
            check = name,
            expected = %check.expected,
            actual = %check.actual,
            "sanity check failed: {}",
            check.message
        );
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlSummaryCache;
    use crate::datasource::MockDataSource;
    use crate::domain::{RawTransfer, TimeSec};
    use crate::engine::{InternalAddresses, VaultRegistry};
    use crate::ledger::{InMemoryLedgerStore, LedgerStore};
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const TREASURY: &str = "0x2222222222222222222222222222222222222222";
    const VAULT: &str = "0x3333333333333333333333333333333333333333";
    const FRIEND: &str = "0x5555555555555555555555555555555555555555";

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn addresses() -> ClassifierContext {
        ClassifierContext {
            wallet: Address::new("0x0"),
            treasury: Address::new(TREASURY),
            vaults: VaultRegistry::new().with_vault(Address::new(VAULT), "USDC Core"),
            internal: InternalAddresses::default(),
            secondary: None,
            token_decimals: 6,
        }
    }

    fn analyzer(mock: MockDataSource) -> (Analyzer, MockDataSource) {
        let source = Arc::new(mock.clone());
        let ledger = Arc::new(DepositLedger::new(Arc::new(InMemoryLedgerStore::new())));
        let analyzer = Analyzer::new(
            source.clone(),
            source,
            ledger,
            Arc::new(TtlSummaryCache::new(Duration::from_secs(60))),
            addresses(),
            AnalysisSettings::default(),
        );
        (analyzer, mock)
    }

    fn mock() -> MockDataSource {
        MockDataSource::new()
            .with_transfer(RawTransfer::new(
                "0x01",
                Address::new(FRIEND),
                Address::new(WALLET),
                "100000000",
                TimeSec::new(1000),
            ))
            .with_transfer(RawTransfer::new(
                "0x02",
                Address::new(WALLET),
                Address::new(VAULT),
                "100000000",
                TimeSec::new(1100),
            ))
            .with_balance(Address::new(WALLET), d("103"))
    }

    #[tokio::test]
    async fn computes_report_for_wallet() {
        let (analyzer, _) = analyzer(mock());
        let report = analyzer.report(&Address::new(WALLET)).await.unwrap();
        assert_eq!(report.wallet, Address::new(WALLET));
        assert_eq!(report.summary.net_deposited, d("100"));
        assert_eq!(report.summary.unrealized_earnings, d("3"));
        assert!(report.checks.all_passed);
    }

    #[tokio::test]
    async fn second_report_is_cached_until_ledger_write() {
        let (analyzer, mock) = analyzer(mock());
        let wallet = Address::new(WALLET);

        analyzer.report(&wallet).await.unwrap();
        analyzer.report(&wallet).await.unwrap();
        assert_eq!(mock.transfer_fetch_count(), 1);

        analyzer.record_deposit(&wallet, d("100")).await.unwrap();
        let report = analyzer.report(&wallet).await.unwrap();
        assert_eq!(mock.transfer_fetch_count(), 2);
        assert_eq!(report.invested.ledger_value, d("100"));
    }

    #[tokio::test]
    async fn fetch_failures_propagate() {
        let (analyzer, _) = analyzer(MockDataSource::new().with_failure(DataSourceError::RateLimited));
        let err = analyzer.report(&Address::new(WALLET)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DataSource(DataSourceError::RateLimited)
        ));
    }

    /// Store whose first load reads the current record, then parks until released.
    #[derive(Debug)]
    struct StalledLoadStore {
        inner: InMemoryLedgerStore,
        stall_next_load: AtomicBool,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl LedgerStore for StalledLoadStore {
        async fn load(&self, wallet: &Address) -> Result<Option<DepositRecord>, LedgerError> {
            let record = self.inner.load(wallet).await?;
            if self.stall_next_load.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(record)
        }

        async fn save(&self, record: &DepositRecord) -> Result<(), LedgerError> {
            self.inner.save(record).await
        }
    }

    #[tokio::test]
    async fn report_overlapping_a_ledger_write_is_not_cached() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(StalledLoadStore {
            inner: InMemoryLedgerStore::new(),
            stall_next_load: AtomicBool::new(true),
            entered: entered.clone(),
            release: release.clone(),
        });
        let mock = mock();
        let source = Arc::new(mock.clone());
        let analyzer = Arc::new(Analyzer::new(
            source.clone(),
            source,
            Arc::new(DepositLedger::new(store)),
            Arc::new(TtlSummaryCache::new(Duration::from_secs(60))),
            addresses(),
            AnalysisSettings::default(),
        ));
        let wallet = Address::new(WALLET);

        let pending = tokio::spawn({
            let analyzer = analyzer.clone();
            let wallet = wallet.clone();
            async move { analyzer.report(&wallet).await }
        });

        // The report has read the empty ledger; a deposit lands before it finishes.
        entered.notified().await;
        analyzer.record_deposit(&wallet, d("100")).await.unwrap();
        release.notify_one();

        let stale = pending.await.unwrap().unwrap();
        assert_eq!(stale.invested.ledger_value, Decimal::zero());

        let fresh = analyzer.report(&wallet).await.unwrap();
        assert_eq!(mock.transfer_fetch_count(), 2);
        assert_eq!(fresh.invested.ledger_value, d("100"));
    }

    #[tokio::test]
    async fn malformed_rows_reach_the_count_check() {
        let (analyzer, _) = analyzer(mock().with_malformed_rows(1));
        let report = analyzer.report(&Address::new(WALLET)).await.unwrap();
        assert_eq!(report.skipped.malformed, 1);
        assert!(report.checks.transaction_count_check.passed);
        assert!(report
            .checks
            .transaction_count_check
            .message
            .starts_with("3 raw transfers"));
    }
}
