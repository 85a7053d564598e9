//! Domain types for wallet transfer classification and reconciliation.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Address (case-insensitive), TimeSec
//! - RawTransfer input and the classified Transaction model
//! - DepositRecord arithmetic for the principal ledger
//! - TransactionSummary and sanity-check result types

pub mod decimal;
pub mod deposit;
pub mod primitives;
pub mod summary;
pub mod transaction;
pub mod transfer;

pub use decimal::Decimal;
pub use deposit::{DepositOverflow, DepositRecord};
pub use primitives::{Address, AddressParseError, TimeSec};
pub use summary::{SanityCheck, SanityCheckResult, TransactionSummary};
pub use transaction::{sort_chronological, AssociatedFee, Transaction, TransactionType};
pub use transfer::{RawTransfer, TransferHistory};
