use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_wallet, AmountInput, AppState, WalletQuery};
use crate::domain::{Address, DepositRecord};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub wallet: String,
    pub total_deposited: String,
    /// Absent for a wallet the ledger has never seen.
    pub last_updated: Option<i64>,
}

impl LedgerResponse {
    fn from_record(wallet: &Address, record: Option<&DepositRecord>) -> Self {
        Self {
            wallet: wallet.as_str().to_string(),
            total_deposited: record
                .map(|r| r.total_deposited.to_canonical_string())
                .unwrap_or_else(|| "0".to_string()),
            last_updated: record.map(|r| r.last_updated.as_secs()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub wallet: String,
    pub amount: AmountInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub wallet: String,
    pub withdrawn_value: AmountInput,
    pub total_value_before_withdraw: AmountInput,
}

pub async fn get_ledger(
    Query(params): Query<WalletQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    let wallet = parse_wallet(&params.wallet)?;
    let record = state.analyzer.ledger().get_record(&wallet).await?;
    Ok(Json(LedgerResponse::from_record(&wallet, record.as_ref())))
}

pub async fn post_deposit(
    State(state): State<AppState>,
    Json(body): Json<DepositRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let wallet = parse_wallet(&body.wallet)?;
    let amount = body.amount.parse("amount")?;
    let record = state.analyzer.record_deposit(&wallet, amount).await?;
    Ok(Json(LedgerResponse::from_record(&wallet, Some(&record))))
}

pub async fn post_withdraw(
    State(state): State<AppState>,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let wallet = parse_wallet(&body.wallet)?;
    let withdrawn = body.withdrawn_value.parse("withdrawnValue")?;
    let before = body
        .total_value_before_withdraw
        .parse("totalValueBeforeWithdraw")?;
    let record = state
        .analyzer
        .record_withdrawal(&wallet, withdrawn, before)
        .await?;
    Ok(Json(LedgerResponse::from_record(&wallet, Some(&record))))
}
