use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::{parse_wallet, AppState, WalletQuery};
use crate::domain::TransactionType;
use crate::engine::TransactionView;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub wallet: String,
    pub transaction_count: usize,
    pub transactions: Vec<TransactionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: String,
    pub timestamp: i64,
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_fee: Option<FeeDto>,
    pub reclassified: bool,
    pub balance_after: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeDto {
    pub amount: String,
    pub tx_hash: String,
}

impl From<&TransactionView> for TransactionDto {
    fn from(view: &TransactionView) -> Self {
        let tx = &view.transaction;
        Self {
            id: tx.id.clone(),
            tx_type: tx.tx_type,
            amount: tx.amount.to_canonical_string(),
            timestamp: tx.timestamp.as_secs(),
            tx_hash: tx.tx_hash.clone(),
            from: tx.from.as_str().to_string(),
            to: tx.to.as_str().to_string(),
            vault_name: tx.vault_name.clone(),
            associated_fee: tx.associated_fee.as_ref().map(|f| FeeDto {
                amount: f.amount.to_canonical_string(),
                tx_hash: f.tx_hash.clone(),
            }),
            reclassified: tx.reclassified,
            balance_after: view.balance_after.to_canonical_string(),
        }
    }
}

/// Chronological transactions with the running wallet balance after each one.
pub async fn get_transactions(
    Query(params): Query<WalletQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let wallet = parse_wallet(&params.wallet)?;
    let report = state.analyzer.report(&wallet).await?;

    let transactions: Vec<TransactionDto> =
        report.transactions.iter().map(TransactionDto::from).collect();

    Ok(Json(TransactionsResponse {
        wallet: wallet.as_str().to_string(),
        transaction_count: transactions.len(),
        transactions,
    }))
}
