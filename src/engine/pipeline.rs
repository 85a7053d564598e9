//! End-to-end composition of the pure engines over one snapshot of wallet data.

use crate::domain::{
    sort_chronological, Address, Decimal, RawTransfer, SanityCheckResult, TimeSec,
    TransactionSummary,
};
use crate::engine::arbiter::{
    arbitrate, replay_principal, ArbiterInputs, ArbiterThresholds, Arbitration,
};
use crate::engine::audit::{build_audit_trail, AuditLine, TransactionView};
use crate::engine::classifier::{classify, ClassifierContext, SkipCounts};
use crate::engine::fee_matcher::{match_fees, FeeMatchConfig, FeeMatchReport};
use crate::engine::reconciliation::{reconcile, FeeRate, TransferCounts};
use serde::Serialize;

/// Tunables shared by every wallet analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub fee_rate: FeeRate,
    pub fee_match: FeeMatchConfig,
    pub thresholds: ArbiterThresholds,
}

/// Everything the pipeline needs, already fetched.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub transfers: &'a [RawTransfer],
    /// Rows the transfer source dropped as undecodable; counted as raw and skipped.
    pub malformed_rows: usize,
    pub context: &'a ClassifierContext,
    pub current_balance: Decimal,
    /// Deposit ledger total for the wallet; zero when it has no record.
    pub ledger_total: Decimal,
}

/// Full result for one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    pub wallet: Address,
    /// Chronological, with running wallet balance.
    pub transactions: Vec<TransactionView>,
    pub summary: TransactionSummary,
    pub checks: SanityCheckResult,
    pub invested: Arbitration,
    pub audit: Vec<AuditLine>,
    pub skipped: SkipCounts,
    pub fee_matching: FeeMatchReport,
    pub generated_at: TimeSec,
}

/// Classify, match fees, reconcile, arbitrate, and build the audit trail.
///
/// The current balance is clamped to [`Decimal::max_amount`] in magnitude.
pub fn analyze(input: AnalysisInput<'_>, settings: &AnalysisSettings) -> WalletReport {
    let current_balance = input.current_balance.clamp_to_amount_bounds();
    let classified = classify(input.transfers, input.context);
    let mut skipped = classified.skipped;
    skipped.malformed = input.malformed_rows;
    let counts = TransferCounts {
        raw: classified.raw_count + input.malformed_rows,
        classified: classified.classified_count(),
        skipped: skipped.total(),
    };

    let mut transactions = classified.transactions;
    let fee_matching = match_fees(&mut transactions, &settings.fee_match);

    let reconciliation = reconcile(
        &transactions,
        current_balance,
        counts,
        settings.fee_rate,
    );

    let invested = arbitrate(
        ArbiterInputs {
            history: replay_principal(&transactions, settings.fee_rate),
            ledger: input.ledger_total.non_negative(),
            balance: current_balance,
        },
        &settings.thresholds,
    );

    sort_chronological(&mut transactions);
    let trail = build_audit_trail(&transactions, settings.fee_rate);

    WalletReport {
        wallet: input.context.wallet.clone(),
        transactions: trail.transactions,
        summary: reconciliation.summary,
        checks: reconciliation.checks,
        invested,
        audit: trail.lines,
        skipped,
        fee_matching,
        generated_at: TimeSec::now(),
    }
}
