//! Prediction sandbox rendering from feed to page.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use enzoworks::chat::ChatService;
use enzoworks::llm::ProviderKind;
use enzoworks::sandbox::document::Document;
use enzoworks::sandbox::feed::HttpSnapshotSource;
use enzoworks::sandbox::markup::{ACCUMULATING_TEXT, ERROR_HTML};
use enzoworks::sandbox::{MountState, PredictionPanel, RenderOutcome, GRID_ID};
use enzoworks::server::build_router;
use enzoworks::server::routes::SiteState;

use crate::stubs::{StubSource, MULTI_ASSET_SNAPSHOT, USDJPY_SNAPSHOT};

const PAGE: &str = r#"<header><span id="update-time">{{update-time}}</span><span id="target-date">{{target-date}}</span><i>{{gemini-avg-error}}</i></header><section id="ai-grid">{{ai-grid}}</section>"#;

fn panel(body: &str) -> PredictionPanel {
    PredictionPanel::new(Document::from_template(PAGE), StubSource::new(body))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_usdjpy_scenario() {
    let p = panel(USDJPY_SNAPSHOT);
    assert_eq!(p.render().await, RenderOutcome::Rendered { cards: 1 });

    let grid = p.element(GRID_ID).await.unwrap();
    assert!(grid.contains("NOW: ¥150.000"));
    assert!(grid.contains("¥151.500"));
    assert!(grid.contains("¥148.000"));
    assert!(grid.contains(r#"<span class="trend up">▲ +1.00%</span>"#));
    assert!(grid.contains(r#"<span class="trend down">▼ -1.33%</span>"#));
    assert!(grid.contains(ACCUMULATING_TEXT));

    assert_eq!(p.element("update-time").await.as_deref(), Some("2026-10-17 07:00:00"));
    assert_eq!(p.element("gemini-avg-error").await.as_deref(), Some("0.65%"));
}

#[tokio::test]
async fn test_cards_follow_feed_order_and_dedup_settlements() {
    let p = panel(MULTI_ASSET_SNAPSHOT);
    assert_eq!(p.render().await, RenderOutcome::Rendered { cards: 3 });
    let grid = p.element(GRID_ID).await.unwrap();

    let nikkei = grid.find(r#"data-asset="Nikkei 225""#).unwrap();
    let sp = grid.find(r#"data-asset="S&amp;P 500""#).unwrap();
    let usdjpy = grid.find(r#"data-asset="USD/JPY""#).unwrap();
    assert!(nikkei < sp && sp < usdjpy);

    // Only the 2026-10-16 GPT settlement survives; Gemini is still pending.
    assert!(grid.contains("2026-10-16"));
    assert!(!grid.contains("2026-10-14"));
    assert!(!grid.contains("ERR 2.50%"));
    assert!(grid.contains("ERR 0.30%"));
    assert_eq!(grid.matches(r#"<span class="verdict hit">HIT</span>"#).count(), 1);
    assert_eq!(grid.matches(r#"<span class="verdict none">"#).count(), 1);

    assert!(grid.contains(r#"<span class="trend up">▲ +0.50%</span>"#));
    assert!(grid.contains(r#"<span class="trend flat">▶ 0.00%</span>"#));
    assert!(grid.contains("market-badge closed"));
    assert!(grid.contains("NOW: $5,800.00"));
    assert!(grid.contains("NOW: ¥38,500.00"));
}

#[tokio::test]
async fn test_http_404_shows_only_error() {
    let base = serve(Router::new()).await;
    let source = HttpSnapshotSource::new(format!("{base}/ai_predictions.json"), None).unwrap();
    let p = PredictionPanel::new(Document::from_template(PAGE), Arc::new(source));

    assert_eq!(p.render().await, RenderOutcome::Failed);
    assert_eq!(p.state().await, MountState::Error);
    assert_eq!(p.element(GRID_ID).await.as_deref(), Some(ERROR_HTML));
    assert!(!p.html().await.contains("asset-card"));
}

#[tokio::test]
async fn test_http_source_renders_served_snapshot() {
    let base = serve(Router::new().route(
        "/ai_predictions.json",
        get(|| async { USDJPY_SNAPSHOT }),
    ))
    .await;
    let source = HttpSnapshotSource::new(format!("{base}/ai_predictions.json"), None).unwrap();
    let p = PredictionPanel::new(Document::from_template(PAGE), Arc::new(source));

    assert_eq!(p.render().await, RenderOutcome::Rendered { cards: 1 });
}

#[tokio::test]
async fn test_incomplete_snapshot_is_failure() {
    let p = PredictionPanel::new(
        Document::from_template(PAGE),
        StubSource::new(r#"{"latest_forecast": {}}"#),
    );
    assert_eq!(p.render().await, RenderOutcome::Failed);
    assert!(!p.html().await.contains("asset-card"));
}

#[tokio::test]
async fn test_sandbox_route_renders_page() {
    let app = build_router(Arc::new(SiteState {
        chat: Arc::new(ChatService::unconfigured(ProviderKind::Gemini, "GEMINI_API_KEY")),
        feed: StubSource::new(MULTI_ASSET_SNAPSHOT),
        feed_path: PathBuf::from("unused.json"),
    }));

    let resp = app
        .oneshot(Request::builder().uri("/sandbox").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(html.matches(r#"class="asset-card""#).count(), 3);
    assert!(html.contains(r#"<b id="gpt-win-rate">-</b>"#));
    assert!(html.contains(r#"<span id="target-date">2026-10-20</span>"#));
}
