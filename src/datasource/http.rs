//! Shared GET-with-retry used by the HTTP collaborators.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;

const MAX_ELAPSED: Duration = Duration::from_secs(30);

/// GET `url` with `query` and decode JSON, retrying 429s, 5xx and network failures.
pub(super) async fn get_json(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<serde_json::Value, DataSourceError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(MAX_ELAPSED),
        ..Default::default()
    };

    retry(backoff, || async {
        let response = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(DataSourceError::NetworkError(e.to_string())))?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
    })
    .await
}
