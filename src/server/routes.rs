//! Site route handlers.
//!
//! State is shared via `Arc<SiteState>`.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chat::{ChatError, ChatReply, ChatRequest, ChatService};
use crate::sandbox::document::Document;
use crate::sandbox::feed::SnapshotSource;
use crate::sandbox::PredictionPanel;

/// Page template for `GET /sandbox` (compiled into the binary).
pub const SANDBOX_TEMPLATE: &str = include_str!("templates/sandbox.html");

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct SiteState {
    pub chat: Arc<ChatService>,
    pub feed: Arc<dyn SnapshotSource>,
    /// Snapshot file served verbatim at `/ai_predictions.json`.
    pub feed_path: PathBuf,
}

pub type AppState = Arc<SiteState>;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/chat
///
/// An unreadable body is treated as a request with no message, so it
/// fails validation with 400 like any other short message.
pub async fn post_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    let chat = state.chat.clone();
    let task = tokio::spawn(
        async move { chat.reply(request.message.as_deref()).await }.instrument(span.clone()),
    );

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            let _enter = span.enter();
            error!(error = %e, "Chat task aborted");
            Err(ChatError::Internal(e.to_string()))
        }
    };

    match result {
        Ok(text) => Json(ChatReply { response: text }).into_response(),
        Err(e) => e.into_response(),
    }
}

/// OPTIONS /api/chat without CORS preflight headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other method on /api/chat.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

/// GET /ai_predictions.json
pub async fn get_snapshot(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.feed_path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/json; charset=utf-8"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!(path = %state.feed_path.display(), error = %e, "Snapshot file unavailable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// GET /sandbox
///
/// Each request is its own render session over a fresh page, so
/// concurrent requests each fetch and render; none is skipped.
pub async fn get_sandbox(State(state): State<AppState>) -> Html<String> {
    let panel = PredictionPanel::new(
        Document::from_template(SANDBOX_TEMPLATE),
        state.feed.clone(),
    );
    panel.render().await;
    Html(panel.html().await)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
