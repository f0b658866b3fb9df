//! File-backed ledger store with a remote bootstrap fallback.
//!
//! The ledger lives in a single JSON file. Saves go to a sibling temp file
//! that is renamed over the original, so a crash mid-write never leaves a
//! truncated ledger behind. When the file is missing or unreadable at
//! startup the store asks a `SnapshotSource` (normally a static JSON
//! document on the web) for an initial ledger.

use crate::ledger::Ledger;
use crate::retry::{RetryPolicy, Transient};

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ledger file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bootstrap download failed: {0}")]
    Download(String),
    #[error("bootstrap returned HTTP {0}")]
    Http(u16),
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Download(_) | StoreError::Http(_))
    }
}

/// Where an initial ledger comes from when there is no usable local copy.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Ledger, StoreError>;
}

/// Downloads the canonical snapshot over HTTP.
pub struct HttpSnapshot {
    http: Client,
    url: String,
}

impl HttpSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshot {
    async fn fetch_snapshot(&self) -> Result<Ledger, StoreError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| StoreError::Download(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::Http(resp.status().as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Download(e.to_string()))?;
        // A snapshot that downloads but does not parse will not get better by retrying.
        Ok(serde_json::from_str(&body)?)
    }
}

/// No remote fallback: start from an empty ledger.
pub struct EmptySnapshot;

#[async_trait]
impl SnapshotSource for EmptySnapshot {
    async fn fetch_snapshot(&self) -> Result<Ledger, StoreError> {
        Ok(Ledger::default())
    }
}

pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the local ledger file.
    pub fn read_local(&self) -> Result<Ledger, StoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Local ledger if readable, otherwise the bootstrap snapshot.
    pub async fn load<S: SnapshotSource + ?Sized>(
        &self,
        bootstrap: &S,
        retry: &RetryPolicy,
    ) -> Result<Ledger, StoreError> {
        match self.read_local() {
            Ok(ledger) => {
                info!(
                    path = %self.path.display(),
                    stakers = ledger.entries.len(),
                    checkpoint = ledger.checkpoint(),
                    "loaded ledger"
                );
                Ok(ledger)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "local ledger unavailable, fetching bootstrap snapshot"
                );
                let ledger = retry
                    .run("bootstrap snapshot", || bootstrap.fetch_snapshot())
                    .await?;
                info!(
                    stakers = ledger.entries.len(),
                    checkpoint = ledger.checkpoint(),
                    "bootstrapped ledger"
                );
                Ok(ledger)
            }
        }
    }

    /// Overwrite the durable copy with the full ledger.
    pub fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(ledger)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(
            path = %self.path.display(),
            checkpoint = ledger.checkpoint(),
            "ledger saved"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
