//! Attaching platform fees to the withdrawals that generated them.
//!
//! Matching is strictly one-to-one. Each withdrawal first looks for a fee paid in the same
//! transaction, then for the nearest unconsumed fee inside the time window. Fees nobody claims
//! become ordinary sends.

use crate::domain::{AssociatedFee, Transaction, TransactionType};
use serde::Serialize;

/// Default maximum distance between a withdrawal and its fee.
pub const DEFAULT_FEE_MATCH_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeMatchConfig {
    pub window_secs: i64,
}

impl Default for FeeMatchConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_FEE_MATCH_WINDOW_SECS,
        }
    }
}

/// How a fee was tied to its withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeMatchKind {
    /// Same transaction hash.
    Exact,
    /// Nearest fee inside the time window.
    Window,
}

/// Counts of what the matcher did, for logging and the audit notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeMatchReport {
    pub exact_matches: usize,
    pub window_matches: usize,
    pub reclassified: usize,
    /// `(withdrawal index, fee index, kind)` into the input slice.
    #[serde(skip)]
    pub pairs: Vec<(usize, usize, FeeMatchKind)>,
}

impl FeeMatchReport {
    pub fn matched(&self) -> usize {
        self.exact_matches + self.window_matches
    }
}

/// Match fees to withdrawals in place.
///
/// Withdrawals are visited in slice order, so an earlier withdrawal gets first pick of an
/// ambiguous fee. Transaction order is preserved.
pub fn match_fees(transactions: &mut [Transaction], config: &FeeMatchConfig) -> FeeMatchReport {
    let withdrawals: Vec<usize> = indices_of(transactions, TransactionType::Withdraw);
    let fees: Vec<usize> = indices_of(transactions, TransactionType::Fee);

    let mut consumed = vec![false; fees.len()];
    let mut report = FeeMatchReport::default();

    for &w in &withdrawals {
        let Some((slot, kind)) = find_fee(transactions, w, &fees, &consumed, config) else {
            continue;
        };
        consumed[slot] = true;

        let fee_idx = fees[slot];
        let fee = AssociatedFee {
            amount: transactions[fee_idx].amount,
            tx_hash: transactions[fee_idx].tx_hash.clone(),
        };
        transactions[w].associated_fee = Some(fee);

        match kind {
            FeeMatchKind::Exact => report.exact_matches += 1,
            FeeMatchKind::Window => report.window_matches += 1,
        }
        report.pairs.push((w, fee_idx, kind));
    }

    for (slot, &fee_idx) in fees.iter().enumerate() {
        if !consumed[slot] {
            let tx = &mut transactions[fee_idx];
            tx.tx_type = TransactionType::Send;
            tx.reclassified = true;
            report.reclassified += 1;
        }
    }

    report
}

fn indices_of(transactions: &[Transaction], tx_type: TransactionType) -> Vec<usize> {
    transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is(tx_type))
        .map(|(i, _)| i)
        .collect()
}

fn unconsumed<'a>(
    transactions: &'a [Transaction],
    fees: &'a [usize],
    consumed: &'a [bool],
) -> impl Iterator<Item = (usize, &'a Transaction)> + 'a {
    fees.iter()
        .enumerate()
        .filter(move |(slot, _)| !consumed[*slot])
        .map(move |(slot, &idx)| (slot, &transactions[idx]))
}

/// Returns the slot in `fees` to consume for withdrawal `w`.
fn find_fee(
    transactions: &[Transaction],
    w: usize,
    fees: &[usize],
    consumed: &[bool],
    config: &FeeMatchConfig,
) -> Option<(usize, FeeMatchKind)> {
    let withdrawal = &transactions[w];

    if let Some((slot, _)) = unconsumed(transactions, fees, consumed)
        .find(|(_, fee)| fee.tx_hash == withdrawal.tx_hash)
    {
        return Some((slot, FeeMatchKind::Exact));
    }

    // min_by_key keeps the first of equal keys, so distance ties go to the earliest fee.
    unconsumed(transactions, fees, consumed)
        .map(|(slot, fee)| (slot, fee.timestamp.distance(withdrawal.timestamp)))
        .filter(|(_, dt)| *dt <= config.window_secs)
        .min_by_key(|(_, dt)| *dt)
        .map(|(slot, _)| (slot, FeeMatchKind::Window))
}
