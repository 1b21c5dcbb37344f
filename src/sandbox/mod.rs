//! Prediction sandbox: fetch the latest snapshot and render it into a
//! page as asset cards.
//!
//! A [`PredictionPanel`] is one render session over one page. It owns its
//! document and mount-point state, and lets only one render run at a
//! time; a call that arrives while another is in flight returns
//! [`RenderOutcome::Skipped`] without touching the page. The guard is
//! per panel: the `/sandbox` route builds a fresh panel for every
//! request, so it only serialises renders within that one session.

pub mod cards;
pub mod document;
pub mod feed;
pub mod markup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::types::{AiModel, Snapshot};
use document::Document;
use feed::SnapshotSource;

pub const GRID_ID: &str = "ai-grid";
pub const UPDATE_TIME_ID: &str = "update-time";
pub const TARGET_DATE_ID: &str = "target-date";

/// Shown in a text node whose value the feed omitted.
pub const PLACEHOLDER: &str = "-";

/// What the mount point currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Loading,
    Rendered { cards: usize },
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { cards: usize },
    Failed,
    /// Another render was already in flight.
    Skipped,
}

struct Page {
    document: Document,
    state: MountState,
}

pub struct PredictionPanel {
    source: Arc<dyn SnapshotSource>,
    page: Mutex<Page>,
    in_flight: AtomicBool,
}

/// Holds the in-flight flag until dropped, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PredictionPanel {
    pub fn new(document: Document, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            page: Mutex::new(Page {
                document,
                state: MountState::Loading,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Fetch the snapshot and rebuild the page.
    pub async fn render(&self) -> RenderOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Render already in flight; skipping");
            return RenderOutcome::Skipped;
        };

        {
            let mut page = self.page.lock().await;
            page.state = MountState::Loading;
            page.document.set_html(GRID_ID, markup::LOADING_HTML);
        }

        let fetched = self.source.fetch().await;

        let mut page = self.page.lock().await;
        match fetched {
            Ok(snapshot) => {
                let cards = apply_snapshot(&mut page.document, &snapshot);
                page.state = MountState::Rendered { cards };
                info!(cards, source = %self.source.describe(), "Prediction sandbox rendered");
                RenderOutcome::Rendered { cards }
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "Failed to load prediction snapshot");
                clear_text_nodes(&mut page.document);
                page.document.set_html(GRID_ID, markup::ERROR_HTML);
                page.state = MountState::Error;
                RenderOutcome::Failed
            }
        }
    }

    pub async fn state(&self) -> MountState {
        self.page.lock().await.state
    }

    /// The page with all current content filled in.
    pub async fn html(&self) -> String {
        self.page.lock().await.document.render()
    }

    /// Current inner content of one element.
    pub async fn element(&self, id: &str) -> Option<String> {
        self.page.lock().await.document.get(id).map(str::to_string)
    }
}

/// Write text nodes and the card grid. Returns the number of cards.
fn apply_snapshot(doc: &mut Document, snapshot: &Snapshot) -> usize {
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());

    doc.set_text(UPDATE_TIME_ID, &or_dash(snapshot.metadata.last_updated.clone()));
    doc.set_text(TARGET_DATE_ID, &or_dash(snapshot.metadata.target_date.clone()));

    for model in AiModel::ALL {
        let stats = snapshot.stats(*model);
        let prefix = model.id_prefix();

        let win_rate = stats
            .and_then(|s| s.win_rate)
            .map(|v| format!("{}%", v.normalize()));
        let avg_error = stats
            .and_then(|s| s.avg_error)
            .map(|v| format!("{}%", v.normalize()));
        let count = stats.and_then(|s| s.count).map(|c| c.to_string());

        doc.set_text(&format!("{prefix}-win-rate"), &or_dash(win_rate));
        doc.set_text(&format!("{prefix}-avg-error"), &or_dash(avg_error));
        doc.set_text(&format!("{prefix}-count"), &or_dash(count));
    }

    let cards = cards::build_cards(snapshot);
    doc.set_html(GRID_ID, markup::render_cards(&cards));
    cards.len()
}

/// Reset every text node to the placeholder so a failed render leaves no
/// figures from an earlier snapshot behind.
fn clear_text_nodes(doc: &mut Document) {
    doc.set_text(UPDATE_TIME_ID, PLACEHOLDER);
    doc.set_text(TARGET_DATE_ID, PLACEHOLDER);
    for model in AiModel::ALL {
        let prefix = model.id_prefix();
        for field in ["win-rate", "avg-error", "count"] {
            doc.set_text(&format!("{prefix}-{field}"), PLACEHOLDER);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
