//! Snapshot sources.
//!
//! A render pass fetches the snapshot fresh every time. The HTTP source
//! appends a `t=<epoch millis>` query parameter so intermediate caches
//! never serve a stale document.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::types::{FeedError, Snapshot};

/// Where prediction snapshots come from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch, decode and validate one snapshot.
    async fn fetch(&self) -> Result<Snapshot, FeedError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Decode a snapshot document and check its required structure.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot, FeedError> {
    let snapshot: Snapshot =
        serde_json::from_slice(bytes).map_err(|e| FeedError::Decode(e.to_string()))?;
    snapshot.validate()?;
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpSnapshotSource {
    http: Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build snapshot HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    fn cache_busted_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{sep}t={}",
            self.url,
            chrono::Utc::now().timestamp_millis()
        )
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Snapshot, FeedError> {
        let url = self.cache_busted_url();
        debug!(%url, "Fetching prediction snapshot");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        parse_snapshot(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Reads the snapshot from disk on every fetch.
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch(&self) -> Result<Snapshot, FeedError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FeedError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        parse_snapshot(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
