//! Classified transaction type.

use crate::domain::{Address, Decimal, RawTransfer, TimeSec};
use serde::{Deserialize, Serialize};

/// Semantic category of a wallet transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Wallet → vault.
    Deposit,
    /// Vault → wallet.
    Withdraw,
    /// Wallet → treasury (performance fee).
    Fee,
    /// External → wallet.
    Receive,
    /// Wallet → external.
    Send,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Fee => "fee",
            TransactionType::Receive => "receive",
            TransactionType::Send => "send",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fee attached to a withdrawal by the fee matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedFee {
    pub amount: Decimal,
    pub tx_hash: String,
}

/// A classified wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Stable identifier derived from (hash, from, to, value, seq).
    pub id: String,
    /// Position of the source transfer in the raw input list.
    pub seq: usize,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Human units (base units scaled by token decimals).
    pub amount: Decimal,
    pub timestamp: TimeSec,
    pub tx_hash: String,
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_fee: Option<AssociatedFee>,
    /// Set when an unmatched fee was turned into a send.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reclassified: bool,
}

impl Transaction {
    /// Build a transaction from its source transfer. Only the classifier calls this.
    pub fn from_transfer(
        transfer: &RawTransfer,
        seq: usize,
        tx_type: TransactionType,
        amount: Decimal,
        vault_name: Option<String>,
    ) -> Self {
        Self {
            id: Self::compute_id(transfer, seq),
            seq,
            tx_type,
            amount,
            timestamp: transfer.timestamp,
            tx_hash: transfer.tx_hash.clone(),
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            vault_name,
            associated_fee: None,
            reclassified: false,
        }
    }

    /// Stable id for a transfer at position `seq`.
    ///
    /// One on-chain transaction can carry several transfers with identical fields (batched
    /// payouts), so the sequence index participates in the digest.
    pub fn compute_id(transfer: &RawTransfer, seq: usize) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, &transfer.tx_hash);
        hash_var(&mut hasher, transfer.from.as_str());
        hash_var(&mut hasher, transfer.to.as_str());
        hash_var(&mut hasher, transfer.value.trim());
        hasher.update((seq as u64).to_le_bytes());

        let hash = hasher.finalize();
        format!("tx:{}", hex::encode(&hash[..16]))
    }

    pub fn is(&self, tx_type: TransactionType) -> bool {
        self.tx_type == tx_type
    }

    /// Fee amount attached to this withdrawal, zero otherwise.
    pub fn fee_amount(&self) -> Decimal {
        self.associated_fee
            .as_ref()
            .map(|f| f.amount)
            .unwrap_or_default()
    }
}

/// Sort transactions chronologically; ties keep raw input order.
pub fn sort_chronological(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| (a.timestamp, a.seq).cmp(&(b.timestamp, b.seq)));
}
