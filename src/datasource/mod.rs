//! Collaborator abstractions for fetching raw transfers and live balances.

use crate::domain::{Address, Decimal, TransferHistory};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod explorer;
mod http;
pub mod mock;
pub mod position;

pub use explorer::ExplorerDataSource;
pub use mock::MockDataSource;
pub use position::PositionApiClient;

/// Source of a wallet's token transfer history.
///
/// Implementations handle pagination and retry/backoff.
#[async_trait]
pub trait TransferSource: Send + Sync + fmt::Debug {
    /// Fetch every transfer in which `wallet` is sender or recipient.
    ///
    /// # Returns
    /// Transfers in the order the collaborator reports them. Rows with an unparsable `value`
    /// are kept so the classifier can count them as skipped; rows that cannot be decoded at all
    /// are only counted in [`TransferHistory::malformed`].
    async fn fetch_transfers(&self, wallet: &Address) -> Result<TransferHistory, DataSourceError>;
}

/// Source of a wallet's current position value.
#[async_trait]
pub trait BalanceSource: Send + Sync + fmt::Debug {
    /// Current balance in human units. Non-finite values are reported as zero.
    async fn fetch_balance(&self, wallet: &Address) -> Result<Decimal, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// Connection timeout, DNS failure, and the like.
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },
    /// Invalid JSON or an unexpected response shape.
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Rate limited")]
    RateLimited,
    /// The collaborator answered but reported a failure in its payload.
    #[error("API error: {0}")]
    Api(String),
}
