use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::{parse_wallet, AppState, WalletQuery};
use crate::domain::{SanityCheck, TransactionSummary};
use crate::engine::{Arbitration, ArbitrationRule, InvestedSource, SkipCounts, WalletReport};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub wallet: String,
    pub summary: SummaryDto,
    pub checks: ChecksDto,
    pub amount_invested: InvestedDto,
    pub skipped: SkipCounts,
    pub generated_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    pub total_deposited_to_vaults: String,
    pub total_withdrawn_from_vaults: String,
    pub total_fees: String,
    pub total_receives: String,
    pub total_sends: String,
    pub total_fees_external: String,
    pub net_deposited: String,
    pub current_balance: String,
    pub unrealized_earnings: String,
    pub gross_yield_realized: String,
    pub realized_earnings: String,
    pub transaction_count: usize,
}

impl From<&TransactionSummary> for SummaryDto {
    fn from(s: &TransactionSummary) -> Self {
        Self {
            total_deposited_to_vaults: s.total_deposited_to_vaults.to_canonical_string(),
            total_withdrawn_from_vaults: s.total_withdrawn_from_vaults.to_canonical_string(),
            total_fees: s.total_fees.to_canonical_string(),
            total_receives: s.total_receives.to_canonical_string(),
            total_sends: s.total_sends.to_canonical_string(),
            total_fees_external: s.total_fees_external.to_canonical_string(),
            net_deposited: s.net_deposited.to_canonical_string(),
            current_balance: s.current_balance.to_canonical_string(),
            unrealized_earnings: s.unrealized_earnings.to_canonical_string(),
            gross_yield_realized: s.gross_yield_realized.to_canonical_string(),
            realized_earnings: s.realized_earnings.to_canonical_string(),
            transaction_count: s.transaction_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDto {
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl From<&SanityCheck> for CheckDto {
    fn from(c: &SanityCheck) -> Self {
        Self {
            passed: c.passed,
            expected: c.expected.to_canonical_string(),
            actual: c.actual.to_canonical_string(),
            message: c.message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksDto {
    pub net_deposited_check: CheckDto,
    pub realized_earnings_check: CheckDto,
    pub cash_flow_check: CheckDto,
    pub transaction_count_check: CheckDto,
    pub all_passed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestedDto {
    pub value: String,
    pub source: InvestedSource,
    pub rule: ArbitrationRule,
    pub history_value: Option<String>,
    pub ledger_value: String,
}

impl From<&Arbitration> for InvestedDto {
    fn from(a: &Arbitration) -> Self {
        Self {
            value: a.amount_invested.to_canonical_string(),
            source: a.source,
            rule: a.rule,
            history_value: a.history_value.map(|d| d.to_canonical_string()),
            ledger_value: a.ledger_value.to_canonical_string(),
        }
    }
}

impl From<&WalletReport> for SummaryResponse {
    fn from(report: &WalletReport) -> Self {
        let checks = &report.checks;
        Self {
            wallet: report.wallet.as_str().to_string(),
            summary: SummaryDto::from(&report.summary),
            checks: ChecksDto {
                net_deposited_check: (&checks.net_deposited_check).into(),
                realized_earnings_check: (&checks.realized_earnings_check).into(),
                cash_flow_check: (&checks.cash_flow_check).into(),
                transaction_count_check: (&checks.transaction_count_check).into(),
                all_passed: checks.all_passed,
            },
            amount_invested: InvestedDto::from(&report.invested),
            skipped: report.skipped,
            generated_at: report.generated_at.as_secs(),
        }
    }
}

pub async fn get_summary(
    Query(params): Query<WalletQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let wallet = parse_wallet(&params.wallet)?;
    let report = state.analyzer.report(&wallet).await?;
    Ok(Json(SummaryResponse::from(report.as_ref())))
}
