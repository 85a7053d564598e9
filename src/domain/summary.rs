//! Reconciliation outputs: the financial summary and its sanity checks.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregates recomputed from a fee-matched transaction list and a balance snapshot.
///
/// Read-only; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_deposited_to_vaults: Decimal,
    pub total_withdrawn_from_vaults: Decimal,
    /// Fees attached to withdrawals only.
    pub total_fees: Decimal,
    pub total_receives: Decimal,
    pub total_sends: Decimal,
    /// Transactions still typed as fees after matching.
    pub total_fees_external: Decimal,
    /// Capital currently invested.
    pub net_deposited: Decimal,
    pub current_balance: Decimal,
    pub unrealized_earnings: Decimal,
    pub gross_yield_realized: Decimal,
    pub realized_earnings: Decimal,
    pub transaction_count: usize,
}

/// Outcome of one reconciliation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityCheck {
    pub passed: bool,
    pub expected: Decimal,
    pub actual: Decimal,
    pub message: String,
}

impl SanityCheck {
    pub fn new(passed: bool, expected: Decimal, actual: Decimal, message: String) -> Self {
        Self {
            passed,
            expected,
            actual,
            message,
        }
    }
}

/// The four independent checks plus their conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityCheckResult {
    pub net_deposited_check: SanityCheck,
    pub realized_earnings_check: SanityCheck,
    pub cash_flow_check: SanityCheck,
    pub transaction_count_check: SanityCheck,
    pub all_passed: bool,
}

impl SanityCheckResult {
    pub fn new(
        net_deposited_check: SanityCheck,
        realized_earnings_check: SanityCheck,
        cash_flow_check: SanityCheck,
        transaction_count_check: SanityCheck,
    ) -> Self {
        let all_passed = net_deposited_check.passed
            && realized_earnings_check.passed
            && cash_flow_check.passed
            && transaction_count_check.passed;
        Self {
            net_deposited_check,
            realized_earnings_check,
            cash_flow_check,
            transaction_count_check,
            all_passed,
        }
    }

    /// `(name, check)` pairs in a fixed order, for logging and rendering.
    pub fn named(&self) -> [(&'static str, &SanityCheck); 4] {
        [
            ("netDepositedCheck", &self.net_deposited_check),
            ("realizedEarningsCheck", &self.realized_earnings_check),
            ("cashFlowCheck", &self.cash_flow_check),
            ("transactionCountCheck", &self.transaction_count_check),
        ]
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &SanityCheck)> {
        self.named().into_iter().filter(|(_, c)| !c.passed)
    }
}
