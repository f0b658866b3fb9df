//! Etherscan-compatible `txlist` client (BscScan by default).

use crate::config::ExplorerConfig;
use crate::explorer::types::{parse_txlist, FetchError, TxListPage};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// One `txlist` request for an inclusive block range. No retries here;
/// the fetcher wraps every call in its retry policy.
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn txlist(&self, start_block: u64, end_block: u64) -> Result<TxListPage, FetchError>;
}

pub struct ExplorerClient {
    http: Client,
    api_url: String,
    api_key: String,
    vault_address: String,
    page_size: u32,
}

impl ExplorerClient {
    pub fn new(config: &ExplorerConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            vault_address: config.vault_address.clone(),
            page_size: config.page_size,
        })
    }
}

#[async_trait]
impl ExplorerApi for ExplorerClient {
    async fn txlist(&self, start_block: u64, end_block: u64) -> Result<TxListPage, FetchError> {
        debug!(start = start_block, end = end_block, "explorer txlist");

        let resp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", self.vault_address.clone()),
                ("startblock", start_block.to_string()),
                ("endblock", end_block.to_string()),
                ("page", "1".to_string()),
                ("offset", self.page_size.to_string()),
                ("sort", "asc".to_string()),
                ("apikey", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;
        decode_reply(status, &content_type, &body)
    }
}

/// Check status and content type, then decode the `txlist` envelope.
fn decode_reply(
    status: StatusCode,
    content_type: &str,
    body: &str,
) -> Result<TxListPage, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }
    if !content_type.contains("application/json") {
        return Err(FetchError::Envelope(format!(
            "unexpected content type {content_type:?}"
        )));
    }
    let body: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Envelope(e.to_string()))?;
    parse_txlist(&body)
}
