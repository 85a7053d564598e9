//! Choosing between the history-derived and ledger-derived "amount invested".
//!
//! The history value replays vault flows and strips fee-implied yield from each withdrawal. The
//! ledger value comes from the incremental deposit ledger. They drift apart when history is
//! incomplete or the ledger missed events; [`arbitrate`] walks an ordered decision table and the
//! first rule that applies decides.

use crate::domain::{Decimal, Transaction, TransactionType};
use crate::engine::reconciliation::FeeRate;
use serde::Serialize;

/// Principal/yield split of one withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalSplit {
    pub principal: Decimal,
    pub yield_amount: Decimal,
    /// True when the fee was ignored as implausible.
    pub fee_ignored: bool,
}

/// Split a withdrawal into returned principal and realized yield.
///
/// The fee implies `fee / rate` of yield. If that exceeds the withdrawal, or the fee is more
/// than 10% of the withdrawal, the fee match is treated as malformed and the whole amount
/// counts as principal.
pub fn split_withdrawal(amount: Decimal, fee: Decimal, fee_rate: FeeRate) -> WithdrawalSplit {
    if !fee.is_positive() {
        return WithdrawalSplit {
            principal: amount,
            yield_amount: Decimal::zero(),
            fee_ignored: false,
        };
    }

    let implied_yield = fee_rate.gross_yield(fee);
    let max_plausible_fee = amount * Decimal::from_scaled(10, 2);
    if implied_yield > amount || fee > max_plausible_fee {
        return WithdrawalSplit {
            principal: amount,
            yield_amount: Decimal::zero(),
            fee_ignored: true,
        };
    }

    WithdrawalSplit {
        principal: amount - implied_yield,
        yield_amount: implied_yield,
        fee_ignored: false,
    }
}

/// Replay vault flows chronologically and return the principal still invested.
///
/// Not clamped: a negative result is evidence of incomplete history and is left for the
/// arbiter to reject. `None` when the running total overflows.
pub fn replay_principal(transactions: &[Transaction], fee_rate: FeeRate) -> Option<Decimal> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| (a.timestamp, a.seq).cmp(&(b.timestamp, b.seq)));

    let mut principal = Decimal::zero();
    for tx in ordered {
        principal = match tx.tx_type {
            TransactionType::Deposit => principal.checked_add(tx.amount)?,
            TransactionType::Withdraw => principal
                .checked_sub(split_withdrawal(tx.amount, tx.fee_amount(), fee_rate).principal)?,
            _ => principal,
        };
    }
    Some(principal)
}

/// Which estimate was trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestedSource {
    History,
    Ledger,
}

/// Rows of the decision table, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationRule {
    /// History is missing, negative, or more than the balance allows.
    ImplausibleHistory,
    /// The ledger has never seen this wallet.
    NoLedgerData,
    /// Ledger tracks the balance while history falls far short of it.
    StaleHistory,
    /// The two disagree by more than the divergence threshold.
    Divergent,
    HistoryConsistent,
}

impl ArbitrationRule {
    pub const TABLE: [ArbitrationRule; 5] = [
        ArbitrationRule::ImplausibleHistory,
        ArbitrationRule::NoLedgerData,
        ArbitrationRule::StaleHistory,
        ArbitrationRule::Divergent,
        ArbitrationRule::HistoryConsistent,
    ];

    /// Whether this row fires for `inputs`. Rows are only meaningful in table order.
    pub fn applies(&self, inputs: &ArbiterInputs, t: &ArbiterThresholds) -> bool {
        match self {
            ArbitrationRule::ImplausibleHistory => match inputs.history {
                None => true,
                Some(h) => h.is_negative() || h > inputs.balance + t.impossibility_margin,
            },
            ArbitrationRule::NoLedgerData => inputs.ledger.is_zero(),
            ArbitrationRule::StaleHistory => {
                let history = inputs.history.unwrap_or_default();
                inputs.ledger.abs_diff(inputs.balance) <= t.ledger_match_margin
                    && history < inputs.balance * t.stale_history_ratio
            }
            ArbitrationRule::Divergent => {
                let history = inputs.history.unwrap_or_default();
                let threshold = std::cmp::max(
                    t.divergence_floor,
                    inputs.balance * t.divergence_ratio,
                );
                !inputs.ledger.is_zero() && inputs.ledger.abs_diff(history) > threshold
            }
            ArbitrationRule::HistoryConsistent => true,
        }
    }

    fn resolve(&self, inputs: &ArbiterInputs) -> (InvestedSource, Decimal) {
        match self {
            ArbitrationRule::ImplausibleHistory => {
                let ceiling = inputs.balance.non_negative();
                let amount = std::cmp::min(inputs.ledger, ceiling).non_negative();
                (InvestedSource::Ledger, amount)
            }
            ArbitrationRule::StaleHistory | ArbitrationRule::Divergent => {
                (InvestedSource::Ledger, inputs.ledger)
            }
            ArbitrationRule::NoLedgerData | ArbitrationRule::HistoryConsistent => (
                InvestedSource::History,
                inputs.history.unwrap_or_default(),
            ),
        }
    }
}

/// Dollar and ratio thresholds used by the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterThresholds {
    pub impossibility_margin: Decimal,
    pub ledger_match_margin: Decimal,
    pub stale_history_ratio: Decimal,
    pub divergence_floor: Decimal,
    pub divergence_ratio: Decimal,
}

impl Default for ArbiterThresholds {
    fn default() -> Self {
        Self {
            impossibility_margin: Decimal::one(),
            ledger_match_margin: Decimal::one(),
            stale_history_ratio: Decimal::from_scaled(50, 2),
            divergence_floor: Decimal::from_scaled(10, 0),
            divergence_ratio: Decimal::from_scaled(10, 2),
        }
    }
}

/// Values the decision table reads. `history` is `None` when it could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterInputs {
    pub history: Option<Decimal>,
    pub ledger: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arbitration {
    pub source: InvestedSource,
    pub amount_invested: Decimal,
    pub history_value: Option<Decimal>,
    pub ledger_value: Decimal,
    pub rule: ArbitrationRule,
}

/// Pick the amount invested. First applicable row of [`ArbitrationRule::TABLE`] wins.
pub fn arbitrate(inputs: ArbiterInputs, thresholds: &ArbiterThresholds) -> Arbitration {
    let rule = ArbitrationRule::TABLE
        .into_iter()
        .find(|rule| rule.applies(&inputs, thresholds))
        .unwrap_or(ArbitrationRule::HistoryConsistent);
    let (source, amount_invested) = rule.resolve(&inputs);

    Arbitration {
        source,
        amount_invested,
        history_value: inputs.history,
        ledger_value: inputs.ledger,
        rule,
    }
}
