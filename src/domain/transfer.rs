//! Raw token transfer as handed over by the explorer collaborator.

use crate::domain::{Address, TimeSec};
use serde::{Deserialize, Serialize};

/// One ERC-20 style transfer record. Immutable input to the classifier.
///
/// `value` stays the explorer's integer string (token base units) so that unparsable values can
/// be counted as skipped rather than rejected at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransfer {
    pub tx_hash: String,
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub timestamp: TimeSec,
}

impl RawTransfer {
    pub fn new(
        tx_hash: impl Into<String>,
        from: Address,
        to: Address,
        value: impl Into<String>,
        timestamp: TimeSec,
    ) -> Self {
        Self {
            tx_hash: normalize_tx_hash(&tx_hash.into()),
            from,
            to,
            value: value.into(),
            timestamp,
        }
    }
}

/// A wallet's fetched transfers plus the rows the source could not decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferHistory {
    pub transfers: Vec<RawTransfer>,
    /// Rows missing an identity field (hash, from, to, timestamp).
    pub malformed: usize,
}

impl TransferHistory {
    pub fn extend(&mut self, other: TransferHistory) {
        self.transfers.extend(other.transfers);
        self.malformed += other.malformed;
    }

    /// Rows the source saw, decodable or not.
    pub fn row_count(&self) -> usize {
        self.transfers.len() + self.malformed
    }
}

pub(crate) fn normalize_tx_hash(tx_hash: &str) -> String {
    tx_hash.trim().to_lowercase()
}
