use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_wallet, AppState};
use crate::domain::TransactionType;
use crate::engine::{audit_to_csv, AuditLine};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub wallet: String,
    #[serde(default)]
    pub format: AuditFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub wallet: String,
    pub lines: Vec<AuditLineDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLineDto {
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: String,
    pub wallet_balance: String,
    pub vault_balance: String,
    pub realized_yield: String,
    pub note: String,
    pub tx_hash: String,
}

impl From<&AuditLine> for AuditLineDto {
    fn from(line: &AuditLine) -> Self {
        Self {
            date: line.date.clone(),
            tx_type: line.tx_type,
            amount: line.amount.to_canonical_string(),
            wallet_balance: line.wallet_balance.to_canonical_string(),
            vault_balance: line.vault_balance.to_canonical_string(),
            realized_yield: line.realized_yield.to_canonical_string(),
            note: line.note.clone(),
            tx_hash: line.tx_hash.clone(),
        }
    }
}

/// Audit trail as JSON, or as a CSV attachment with `format=csv`.
pub async fn get_audit(
    Query(params): Query<AuditQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let wallet = parse_wallet(&params.wallet)?;
    let report = state.analyzer.report(&wallet).await?;

    match params.format {
        AuditFormat::Json => Ok(Json(AuditResponse {
            wallet: wallet.as_str().to_string(),
            lines: report.audit.iter().map(AuditLineDto::from).collect(),
        })
        .into_response()),
        AuditFormat::Csv => {
            let body = audit_to_csv(&report.audit)?;
            let disposition = format!("attachment; filename=\"audit-{}.csv\"", wallet.as_str());
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}
