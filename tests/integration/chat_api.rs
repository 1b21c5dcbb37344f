//! `/api/chat` end to end: router, chat service and real provider clients
//! talking to local stand-ins for the upstream APIs.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use enzoworks::chat::ChatService;
use enzoworks::llm::gemini::GeminiClient;
use enzoworks::llm::openai::OpenAiClient;
use enzoworks::llm::{ChatProvider, ProviderKind};
use enzoworks::server::build_router;
use enzoworks::server::routes::SiteState;

use crate::stubs::{StubProvider, StubSource, USDJPY_SNAPSHOT};

fn router_with(provider: Arc<dyn ChatProvider>, kind: ProviderKind) -> Router {
    build_router(Arc::new(SiteState {
        chat: Arc::new(ChatService::new(provider, kind)),
        feed: StubSource::new(USDJPY_SNAPSHOT),
        feed_path: PathBuf::from("unused.json"),
    }))
}

fn post_message(message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": message }).to_string()))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Serve `router` on an ephemeral localhost port and return its base URL.
async fn upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn key() -> SecretString {
    SecretString::new("test-key".to_string())
}

#[tokio::test]
async fn test_relay_forwards_untrimmed_message() {
    let provider = StubProvider::replying("Webサービス開発でお手伝いできます。");
    let app = router_with(provider.clone(), ProviderKind::Gemini);

    let resp = app.oneshot(post_message("  アプリを作りたい  ")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        read_json(resp).await["response"],
        "Webサービス開発でお手伝いできます。"
    );

    assert_eq!(provider.calls(), 1);
    let prompt = provider.last_prompt().unwrap();
    assert_eq!(prompt.user, "  アプリを作りたい  ");
    assert!(prompt.system.contains("/contact"));
}

#[tokio::test]
async fn test_short_messages_never_reach_provider() {
    let provider = StubProvider::replying("unused");
    for message in ["", "    ", "abcd", " ab c "] {
        let app = router_with(provider.clone(), ProviderKind::Gemini);
        let resp = app.oneshot(post_message(message)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["error"], "メッセージは5文字以上でお願いします");
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_upstream_failure_detail_not_leaked() {
    let provider = StubProvider::failing("quota exceeded for project 1234");
    let app = router_with(provider, ProviderKind::OpenAi);

    let resp = app.oneshot(post_message("見積もりをお願いしたいです")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = read_json(resp).await;
    assert_eq!(json["error"], "AIからの応答を取得できませんでした");
    assert!(!json.to_string().contains("quota"));
}

#[tokio::test]
async fn test_gemini_client_end_to_end() {
    let base = upstream(Router::new().route(
        "/*rest",
        post(|| async {
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "ぜひ" }, { "text": "ご相談ください。" }] },
                    "finishReason": "STOP"
                }]
            }))
        }),
    ))
    .await;
    let client = GeminiClient::new(key(), None, None).unwrap().with_base_url(base);
    let app = router_with(Arc::new(client), ProviderKind::Gemini);

    let resp = app.oneshot(post_message("動画制作について")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["response"], "ぜひご相談ください。");
}

#[tokio::test]
async fn test_gemini_without_candidates_is_generic_500() {
    let base = upstream(Router::new().route("/*rest", post(|| async { Json(json!({})) }))).await;
    let client = GeminiClient::new(key(), None, None).unwrap().with_base_url(base);
    let app = router_with(Arc::new(client), ProviderKind::Gemini);

    let resp = app.oneshot(post_message("動画制作について")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(resp).await["error"], "AIからの応答を取得できませんでした");
}

#[tokio::test]
async fn test_openai_client_end_to_end() {
    let base = upstream(Router::new().route(
        "/chat/completions",
        post(|Json(body): Json<Value>| async move {
            let user = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
            Json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": format!("echo: {user}") },
                    "finish_reason": "stop"
                }]
            }))
        }),
    ))
    .await;
    let client = OpenAiClient::new(key(), None, None).unwrap().with_base_url(base);
    let app = router_with(Arc::new(client), ProviderKind::OpenAi);

    let resp = app.oneshot(post_message("セミナー登壇の依頼")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["response"], "echo: セミナー登壇の依頼");
}

#[tokio::test]
async fn test_openai_empty_choices_is_generic_500() {
    let base = upstream(Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    ))
    .await;
    let client = OpenAiClient::new(key(), None, None).unwrap().with_base_url(base);
    let app = router_with(Arc::new(client), ProviderKind::OpenAi);

    let resp = app.oneshot(post_message("セミナー登壇の依頼")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upstream_http_error_is_generic_500() {
    let base = upstream(Router::new().route(
        "/*rest",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
    ))
    .await;
    let client = GeminiClient::new(key(), None, None).unwrap().with_base_url(base);
    let app = router_with(Arc::new(client), ProviderKind::Gemini);

    let resp = app.oneshot(post_message("動画制作について")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(resp).await["error"], "AIからの応答を取得できませんでした");
}
