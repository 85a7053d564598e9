//! Running balances and a per-line audit trail over classified transactions.

use crate::domain::{Decimal, Transaction, TransactionType};
use crate::engine::reconciliation::FeeRate;
use serde::Serialize;
use thiserror::Error;

/// A transaction with the wallet's running balance after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub balance_after: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLine {
    /// UTC, `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub wallet_balance: Decimal,
    pub vault_balance: Decimal,
    pub realized_yield: Decimal,
    pub note: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditTrail {
    pub transactions: Vec<TransactionView>,
    pub lines: Vec<AuditLine>,
}

#[derive(Default)]
struct Running {
    wallet: Decimal,
    vault: Decimal,
    realized_yield: Decimal,
}

impl Running {
    fn apply(&mut self, tx: &Transaction, fee_rate: FeeRate) {
        match tx.tx_type {
            TransactionType::Receive => self.wallet += tx.amount,
            TransactionType::Send | TransactionType::Fee => self.wallet -= tx.amount,
            TransactionType::Deposit => {
                self.wallet -= tx.amount;
                self.vault += tx.amount;
            }
            TransactionType::Withdraw => {
                self.wallet += tx.amount;
                self.vault -= tx.amount;
                let fee = tx.fee_amount();
                if fee.is_positive() {
                    self.realized_yield += fee_rate.gross_yield(fee) - fee;
                }
            }
        }
    }
}

/// Build the running-balance views and audit lines.
///
/// `transactions` must already be in chronological order; balances start from zero.
pub fn build_audit_trail(transactions: &[Transaction], fee_rate: FeeRate) -> AuditTrail {
    let mut running = Running::default();
    let mut trail = AuditTrail {
        transactions: Vec::with_capacity(transactions.len()),
        lines: Vec::with_capacity(transactions.len()),
    };

    for tx in transactions {
        running.apply(tx, fee_rate);

        trail.transactions.push(TransactionView {
            transaction: tx.clone(),
            balance_after: running.wallet,
        });
        trail.lines.push(AuditLine {
            date: format_date(tx),
            tx_type: tx.tx_type,
            amount: tx.amount,
            wallet_balance: running.wallet,
            vault_balance: running.vault,
            realized_yield: running.realized_yield,
            note: note_for(tx),
            tx_hash: tx.tx_hash.clone(),
        });
    }

    trail
}

fn format_date(tx: &Transaction) -> String {
    tx.timestamp
        .to_datetime()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| tx.timestamp.as_secs().to_string())
}

fn note_for(tx: &Transaction) -> String {
    let vault = tx.vault_name.as_deref().unwrap_or("unknown vault");
    match tx.tx_type {
        TransactionType::Deposit => format!("deposit into {}", vault),
        TransactionType::Withdraw => match &tx.associated_fee {
            Some(fee) => format!(
                "withdraw from {}; performance fee {} (tx {})",
                vault,
                fee.amount.to_fixed_string(2),
                fee.tx_hash
            ),
            None => format!("withdraw from {}; no fee matched", vault),
        },
        TransactionType::Fee => "performance fee".to_string(),
        TransactionType::Send if tx.reclassified => {
            "platform fee with no matching withdrawal, counted as send".to_string()
        }
        TransactionType::Send => format!("sent to {}", tx.to),
        TransactionType::Receive => format!("received from {}", tx.from),
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv flush error: {0}")]
    Flush(String),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub const AUDIT_CSV_HEADER: [&str; 8] = [
    "date",
    "type",
    "amount",
    "wallet_balance",
    "vault_balance",
    "realized_yield",
    "note",
    "tx_hash",
];

/// Render audit lines as CSV with two-decimal amounts.
pub fn audit_to_csv(lines: &[AuditLine]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(AUDIT_CSV_HEADER)?;

    for line in lines {
        let amounts = [
            line.amount.to_fixed_string(2),
            line.wallet_balance.to_fixed_string(2),
            line.vault_balance.to_fixed_string(2),
            line.realized_yield.to_fixed_string(2),
        ];
        wtr.write_record([
            line.date.as_str(),
            line.tx_type.as_str(),
            amounts[0].as_str(),
            amounts[1].as_str(),
            amounts[2].as_str(),
            amounts[3].as_str(),
            line.note.as_str(),
            line.tx_hash.as_str(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
