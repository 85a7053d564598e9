pub mod api;
pub mod cache;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod orchestration;

pub use cache::{NoopCache, SummaryCache, TtlSummaryCache};
pub use config::Config;
pub use datasource::{
    BalanceSource, DataSourceError, ExplorerDataSource, MockDataSource, PositionApiClient,
    TransferSource,
};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Decimal, DepositRecord, RawTransfer, SanityCheckResult, TimeSec, Transaction,
    TransactionSummary, TransactionType, TransferHistory,
};
pub use engine::{analyze, AnalysisSettings, WalletReport};
pub use error::AppError;
pub use ledger::{DepositLedger, InMemoryLedgerStore, LedgerError, LedgerStore};
pub use orchestration::{AnalysisError, Analyzer};
