//! Explorer `txlist` response types and envelope validation.

use crate::retry::Transient;
use serde_json::Value;
use thiserror::Error;

/// Sentinel `message` returned when a range holds more rows than one page.
pub const WINDOW_TOO_LARGE: &str = "Result window is too large";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("explorer request failed: {0}")]
    Transport(String),
    #[error("explorer returned HTTP {0}")]
    Http(u16),
    #[error("malformed explorer response: {0}")]
    Envelope(String),
    #[error("explorer rejected request: {0}")]
    Upstream(String),
    #[error("unexpected transaction data: {0}")]
    Schema(String),
    #[error("block {block} alone exceeds the explorer result window")]
    WindowUnsplittable { block: u64 },
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_)
                | FetchError::Http(_)
                | FetchError::Envelope(_)
                | FetchError::Upstream(_)
        )
    }
}

/// A vault transaction as listed by the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub from: String,
    pub input: String,
    pub block_number: u64,
}

impl RawTransaction {
    /// Exact, case-insensitive prefix match of the method selector on `input`.
    pub fn calls(&self, selector: &str) -> bool {
        self.input.len() >= selector.len()
            && self.input.is_char_boundary(selector.len())
            && self.input[..selector.len()].eq_ignore_ascii_case(selector)
    }
}

/// Outcome of a single `txlist` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxListPage {
    /// The range must be split before it can be listed.
    TooLarge,
    Transactions(Vec<RawTransaction>),
}

/// Validate the `{status, message, result}` envelope and decode its rows.
///
/// Envelope problems are transient (the explorer misbehaved and may recover);
/// a well-formed envelope carrying rows we cannot decode is a schema error.
pub fn parse_txlist(body: &Value) -> Result<TxListPage, FetchError> {
    let obj = body
        .as_object()
        .ok_or_else(|| FetchError::Envelope("expected JSON object".to_string()))?;
    if !["result", "message", "status"].iter().any(|k| obj.contains_key(*k)) {
        return Err(FetchError::Envelope(
            "none of 'result', 'message', 'status' present".to_string(),
        ));
    }

    let message = obj.get("message").and_then(Value::as_str).unwrap_or("");
    if message == WINDOW_TOO_LARGE {
        return Ok(TxListPage::TooLarge);
    }

    match obj.get("result") {
        None | Some(Value::Null) => Ok(TxListPage::Transactions(Vec::new())),
        Some(Value::Array(rows)) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| decode_row(row).map_err(|e| FetchError::Schema(format!("row {i}: {e}"))))
            .collect::<Result<Vec<_>, _>>()
            .map(TxListPage::Transactions),
        // Rate limits and key errors come back as status "0" with a string result.
        Some(Value::String(reason)) if message.starts_with("NOTOK") => {
            Err(FetchError::Upstream(reason.clone()))
        }
        Some(other) => Err(FetchError::Schema(format!(
            "'result' is not an array: {}",
            truncate(&other.to_string(), 120)
        ))),
    }
}

fn decode_row(row: &Value) -> Result<RawTransaction, String> {
    let field = |name: &str| row.get(name).ok_or_else(|| format!("missing '{name}'"));

    let from = field("from")?
        .as_str()
        .ok_or("'from' is not a string")?
        .to_ascii_lowercase();
    let input = field("input")?
        .as_str()
        .ok_or("'input' is not a string")?
        .to_string();
    let block_number = match field("blockNumber")? {
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| format!("bad blockNumber {s:?}"))?,
        Value::Number(n) => n.as_u64().ok_or("blockNumber out of range")?,
        _ => return Err("'blockNumber' is not a number".to_string()),
    };

    Ok(RawTransaction {
        from,
        input,
        block_number,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
