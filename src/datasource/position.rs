//! Live balance lookups against the position API.

use super::http::get_json;
use super::{BalanceSource, DataSourceError};
use crate::domain::{Address, Decimal};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Client for `GET {base}/v1/positions/{wallet}`, which answers `{"balance": ...}`.
#[derive(Debug, Clone)]
pub struct PositionApiClient {
    client: Client,
    base_url: String,
}

impl PositionApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BalanceSource for PositionApiClient {
    async fn fetch_balance(&self, wallet: &Address) -> Result<Decimal, DataSourceError> {
        debug!(wallet = %wallet.as_str(), "fetching position balance");
        let url = format!("{}/v1/positions/{}", self.base_url, wallet.as_str());
        let response = get_json(&self.client, &url, &[]).await?;
        parse_balance(&response)
    }
}

/// Accepts the balance as a JSON number or a decimal string.
pub(crate) fn parse_balance(response: &serde_json::Value) -> Result<Decimal, DataSourceError> {
    match response.get("balance") {
        Some(serde_json::Value::String(s)) => Decimal::from_str_canonical(s.trim())
            .map_err(|e| DataSourceError::ParseError(format!("Invalid balance: {}", e))),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .map(Decimal::from_f64_lossy)
            .ok_or_else(|| DataSourceError::ParseError("Invalid balance number".to_string())),
        Some(serde_json::Value::Null) => Ok(Decimal::zero()),
        _ => Err(DataSourceError::ParseError(
            "Missing balance field".to_string(),
        )),
    }
}
