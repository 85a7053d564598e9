//! Aggregating matched transactions into a financial summary and checking it against itself.
//!
//! Checks never fail the computation. A failed check is a diagnostic for the caller to log or
//! alert on.

use crate::domain::{
    Decimal, SanityCheck, SanityCheckResult, Transaction, TransactionSummary, TransactionType,
};

/// Platform performance fee as a fraction of realized yield, in `[0.0001, 1)`.
///
/// The floor keeps `fee / rate` within decimal range for any fee total built from bounded
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// Smallest accepted rate: one basis point.
    pub fn min_rate() -> Decimal {
        Decimal::from_scaled(1, 4)
    }

    /// Returns `None` unless `0.0001 <= rate < 1`.
    pub fn new(rate: Decimal) -> Option<Self> {
        (rate >= Self::min_rate() && rate < Decimal::one()).then_some(FeeRate(rate))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Pre-fee yield implied by a fee: `fee / rate`, saturating at the largest decimal.
    pub fn gross_yield(&self, fee: Decimal) -> Decimal {
        fee.checked_div(self.0).unwrap_or_else(|| {
            let max = Decimal::new(rust_decimal::Decimal::MAX);
            if fee.is_negative() {
                -max
            } else {
                max
            }
        })
    }

    /// Fee implied by the yield a holder kept: `(net / (1 - rate)) * rate`.
    pub fn fee_from_net(&self, net: Decimal) -> Decimal {
        net.checked_div(Decimal::one() - self.0)
            .map(|gross| gross * self.0)
            .unwrap_or_default()
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        FeeRate(Decimal::from_scaled(15, 2))
    }
}

/// Tolerance for the net-deposited identity.
pub fn net_deposited_tolerance() -> Decimal {
    Decimal::from_scaled(1, 3)
}

/// Tolerance for the fee round-trip and cash-flow checks.
pub fn cents_tolerance() -> Decimal {
    Decimal::from_scaled(1, 2)
}

/// Raw vs classified transfer counts for the completeness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferCounts {
    pub raw: usize,
    pub classified: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub summary: TransactionSummary,
    pub checks: SanityCheckResult,
}

#[derive(Default)]
struct Totals {
    deposited: Decimal,
    withdrawn: Decimal,
    fees: Decimal,
    receives: Decimal,
    sends: Decimal,
    fees_external: Decimal,
}

impl Totals {
    fn accumulate(transactions: &[Transaction]) -> Self {
        let mut totals = Totals::default();
        for tx in transactions {
            match tx.tx_type {
                TransactionType::Deposit => totals.deposited += tx.amount,
                TransactionType::Withdraw => {
                    totals.withdrawn += tx.amount;
                    totals.fees += tx.fee_amount();
                }
                TransactionType::Receive => totals.receives += tx.amount,
                TransactionType::Send => totals.sends += tx.amount,
                TransactionType::Fee => totals.fees_external += tx.amount,
            }
        }
        totals
    }
}

/// Build the summary and run all four checks in one pass over `transactions`.
pub fn reconcile(
    transactions: &[Transaction],
    current_balance: Decimal,
    counts: TransferCounts,
    fee_rate: FeeRate,
) -> Reconciliation {
    let totals = Totals::accumulate(transactions);

    let net_deposited = totals.deposited - totals.withdrawn;
    let unrealized_earnings = current_balance - net_deposited;
    let gross_yield_realized = if totals.fees.is_positive() {
        fee_rate.gross_yield(totals.fees)
    } else {
        Decimal::zero()
    };
    let realized_earnings = gross_yield_realized - totals.fees;

    let summary = TransactionSummary {
        total_deposited_to_vaults: totals.deposited,
        total_withdrawn_from_vaults: totals.withdrawn,
        total_fees: totals.fees,
        total_receives: totals.receives,
        total_sends: totals.sends,
        total_fees_external: totals.fees_external,
        net_deposited,
        current_balance,
        unrealized_earnings,
        gross_yield_realized,
        realized_earnings,
        transaction_count: transactions.len(),
    };

    let checks = SanityCheckResult::new(
        net_deposited_check(&summary),
        realized_earnings_check(&summary, fee_rate),
        cash_flow_check(&summary),
        transaction_count_check(counts),
    );

    Reconciliation { summary, checks }
}

fn net_deposited_check(summary: &TransactionSummary) -> SanityCheck {
    let expected = summary.total_deposited_to_vaults - summary.total_withdrawn_from_vaults;
    let actual = summary.net_deposited;
    let passed = expected.abs_diff(actual) < net_deposited_tolerance();
    let message = if passed {
        "deposits minus withdrawals matches net deposited".to_string()
    } else {
        format!(
            "deposits {} - withdrawals {} = {} but net deposited is {}",
            summary.total_deposited_to_vaults, summary.total_withdrawn_from_vaults, expected, actual
        )
    };
    SanityCheck::new(passed, expected, actual, message)
}

fn realized_earnings_check(summary: &TransactionSummary, fee_rate: FeeRate) -> SanityCheck {
    let reverse_fee = if summary.realized_earnings.is_positive() {
        fee_rate.fee_from_net(summary.realized_earnings)
    } else {
        Decimal::zero()
    };
    let passed = reverse_fee.abs_diff(summary.total_fees) < cents_tolerance();
    let message = if passed {
        "fee recomputed from realized earnings matches total fees".to_string()
    } else {
        format!(
            "realized earnings {} imply fee {} at rate {}, but total fees are {}",
            summary.realized_earnings,
            reverse_fee,
            fee_rate.value(),
            summary.total_fees
        )
    };
    SanityCheck::new(passed, summary.total_fees, reverse_fee, message)
}

/// External flows must equal what is currently invested.
fn cash_flow_check(summary: &TransactionSummary) -> SanityCheck {
    let net_cash_flow =
        summary.total_receives - summary.total_sends - summary.total_fees_external;
    let invested_capital = summary.current_balance - summary.unrealized_earnings;
    let passed = net_cash_flow.abs_diff(invested_capital) < cents_tolerance();
    let message = if passed {
        "external cash flow matches invested capital".to_string()
    } else {
        format!(
            "receives {} - sends {} - fees {} = {} but invested capital is {} (difference {})",
            summary.total_receives,
            summary.total_sends,
            summary.total_fees_external,
            net_cash_flow,
            invested_capital,
            net_cash_flow - invested_capital
        )
    };
    SanityCheck::new(passed, invested_capital, net_cash_flow, message)
}

fn transaction_count_check(counts: TransferCounts) -> SanityCheck {
    let accounted = counts.classified + counts.skipped;
    let passed = counts.raw == 0 || counts.raw == accounted;
    let message = if passed {
        format!(
            "{} raw transfers = {} classified + {} skipped",
            counts.raw, counts.classified, counts.skipped
        )
    } else {
        format!(
            "{} raw transfers but {} classified + {} skipped = {}",
            counts.raw, counts.classified, counts.skipped, accounted
        )
    };
    SanityCheck::new(
        passed,
        Decimal::from_scaled(counts.raw as i64, 0),
        Decimal::from_scaled(accounted as i64, 0),
        message,
    )
}
