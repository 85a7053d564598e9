pub mod audit;
pub mod health;
pub mod ledger;
pub mod summary;
pub mod transactions;

use crate::domain::{Address, Decimal};
use crate::error::AppError;
use crate::orchestration::Analyzer;
use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/summary", get(summary::get_summary))
        .route("/v1/transactions", get(transactions::get_transactions))
        .route("/v1/audit", get(audit::get_audit))
        .route("/v1/ledger", get(ledger::get_ledger))
        .route("/v1/ledger/deposit", post(ledger::post_deposit))
        .route("/v1/ledger/withdraw", post(ledger::post_withdraw))
        .layer(cors)
        .with_state(state)
}

/// `?wallet=0x...`
#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub wallet: String,
}

pub(crate) fn parse_wallet(raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|e| AppError::BadRequest(format!("Invalid wallet address: {}", e)))
}

/// Amount accepted as a decimal string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    pub(crate) fn parse(&self, field: &str) -> Result<Decimal, AppError> {
        match self {
            AmountInput::Text(s) => Decimal::from_str(s.trim())
                .map_err(|_| AppError::BadRequest(format!("{} must be a decimal, got {:?}", field, s))),
            AmountInput::Number(n) => Ok(Decimal::from_f64_lossy(*n)),
        }
    }
}
