//! Prediction history persistence.
//!
//! The history file is `{ "records": [...] }` plus whatever other
//! top-level fields the predictor writes. Records are kept as raw JSON so
//! fields this crate doesn't model survive a rewrite.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Status value of a record still waiting for settlement.
const PENDING_STATUS: &str = "pending";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionHistory {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Counts reported after pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: usize,
    pub remaining: usize,
}

impl PredictionHistory {
    /// Keep only pending records. Anything else (settled, unknown status,
    /// no status) is dropped.
    pub fn prune_to_pending(&mut self) -> PruneReport {
        let before = self.records.len();
        self.records
            .retain(|r| r.get("status").and_then(Value::as_str) == Some(PENDING_STATUS));
        PruneReport {
            removed: before - self.records.len(),
            remaining: self.records.len(),
        }
    }
}

/// Load the history file.
pub fn load_history(path: &Path) -> Result<PredictionHistory> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    let history: PredictionHistory = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse history from {}", path.display()))?;
    debug!(path = %path.display(), records = history.records.len(), "History loaded");
    Ok(history)
}

/// Write the history file as 4-space-indented UTF-8 JSON.
pub fn save_history(history: &PredictionHistory, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    history
        .serialize(&mut ser)
        .context("Failed to serialise history")?;

    std::fs::write(path, &buf)
        .with_context(|| format!("Failed to write history to {}", path.display()))?;
    debug!(path = %path.display(), records = history.records.len(), "History saved");
    Ok(())
}

/// Drop every non-pending record from the history file, resetting the
/// aggregate statistics derived from it.
pub fn reset_stats(path: &Path) -> Result<PruneReport> {
    let mut history = load_history(path)?;
    let report = history.prune_to_pending();
    save_history(&history, path)?;
    info!(
        path = %path.display(),
        removed = report.removed,
        remaining = report.remaining,
        "Prediction stats reset"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
