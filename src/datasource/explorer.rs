//! Etherscan-compatible explorer client (`module=account&action=tokentx`).

use super::http::get_json;
use super::{DataSourceError, TransferSource};
use crate::domain::{Address, RawTransfer, TimeSec, TransferHistory};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_MAX_PAGES: usize = 10;

/// Token transfer history from an Etherscan-style explorer API, filtered to one token contract.
#[derive(Debug, Clone)]
pub struct ExplorerDataSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token_contract: Address,
    page_size: usize,
    max_pages: usize,
}

impl ExplorerDataSource {
    pub fn new(base_url: String, token_contract: Address, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            token_contract,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_paging(mut self, page_size: usize, max_pages: usize) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    async fn fetch_page(
        &self,
        wallet: &Address,
        page: usize,
    ) -> Result<TransferHistory, DataSourceError> {
        let mut query = vec![
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("contractaddress", self.token_contract.as_str().to_string()),
            ("address", wallet.as_str().to_string()),
            ("page", page.to_string()),
            ("offset", self.page_size.to_string()),
            ("sort", "asc".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        let response = get_json(&self.client, &self.base_url, &query).await?;
        parse_tokentx_response(&response)
    }
}

#[async_trait]
impl TransferSource for ExplorerDataSource {
    async fn fetch_transfers(&self, wallet: &Address) -> Result<TransferHistory, DataSourceError> {
        let mut history = TransferHistory::default();

        for page in 1..=self.max_pages {
            debug!(wallet = %wallet.as_str(), page, "fetching token transfers");
            let batch = self.fetch_page(wallet, page).await?;
            let rows = batch.row_count();
            history.extend(batch);
            if rows < self.page_size {
                break;
            }
            if page == self.max_pages {
                warn!(
                    wallet = %wallet.as_str(),
                    max_pages = self.max_pages,
                    "transfer history truncated at page limit"
                );
            }
        }

        debug!(
            wallet = %wallet.as_str(),
            count = history.transfers.len(),
            malformed = history.malformed,
            "fetched token transfers"
        );
        Ok(history)
    }
}

/// Decode an explorer envelope: `{"status": "1", "message": "OK", "result": [...]}`.
///
/// Status `"0"` with "No transactions found" is an empty history, not an error.
pub(crate) fn parse_tokentx_response(
    response: &serde_json::Value,
) -> Result<TransferHistory, DataSourceError> {
    let status = response.get("status").and_then(|v| v.as_str()).unwrap_or("");
    let message = response.get("message").and_then(|v| v.as_str()).unwrap_or("");
    let result = response
        .get("result")
        .ok_or_else(|| DataSourceError::ParseError("Missing result field".to_string()))?;

    if status == "0" {
        if message.starts_with("No transactions found") {
            return Ok(TransferHistory::default());
        }
        let detail = result.as_str().unwrap_or(message);
        if detail.to_ascii_lowercase().contains("rate limit") {
            return Err(DataSourceError::RateLimited);
        }
        return Err(DataSourceError::Api(detail.to_string()));
    }

    let rows = result
        .as_array()
        .ok_or_else(|| DataSourceError::ParseError("Expected array result".to_string()))?;

    let mut history = TransferHistory {
        transfers: Vec::with_capacity(rows.len()),
        malformed: 0,
    };
    for row in rows {
        match parse_transfer(row) {
            Ok(transfer) => history.transfers.push(transfer),
            Err(e) => {
                warn!("Skipping malformed transfer row: {}", e);
                history.malformed += 1;
            }
        }
    }
    Ok(history)
}

fn parse_transfer(row: &serde_json::Value) -> Result<RawTransfer, DataSourceError> {
    let field = |name: &str| {
        row.get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", name)))
    };

    let tx_hash = field("hash")?;
    let from = field("from")?;
    let to = field("to")?;
    let timestamp = field("timeStamp")?
        .parse::<i64>()
        .map_err(|e| DataSourceError::ParseError(format!("Invalid timeStamp: {}", e)))?;
    // Left unparsed; a bad value is counted by the classifier instead.
    let value = row.get("value").and_then(|v| v.as_str()).unwrap_or_default();

    Ok(RawTransfer::new(
        tx_hash,
        Address::new(from),
        Address::new(to),
        value,
        TimeSec::new(timestamp),
    ))
}
