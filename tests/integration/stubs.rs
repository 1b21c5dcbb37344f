//! Stub provider and snapshot sources for integration testing.
//!
//! Deterministic, in-memory, no external services.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use enzoworks::llm::{ChatProvider, GenerationParams, Prompt};
use enzoworks::sandbox::feed::{parse_snapshot, SnapshotSource};
use enzoworks::types::{FeedError, ProviderError, Snapshot};

/// A provider that returns a fixed reply and records every prompt.
pub struct StubProvider {
    reply: Result<String, &'static str>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails with an upstream 503 carrying `body`.
    pub fn failing(body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(body),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    async fn generate(
        &self,
        prompt: &Prompt,
        _params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(body) => Err(ProviderError::Status {
                provider: "stub",
                status: 503,
                body: body.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }

    fn model_name(&self) -> String {
        "stub-1".into()
    }
}

/// A snapshot source serving a fixed JSON document.
pub struct StubSource {
    body: String,
}

impl StubSource {
    pub fn new(body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { body: body.into() })
    }
}

#[async_trait]
impl SnapshotSource for StubSource {
    async fn fetch(&self) -> Result<Snapshot, FeedError> {
        parse_snapshot(self.body.as_bytes())
    }

    fn describe(&self) -> String {
        "stub".into()
    }
}

/// The USD/JPY scenario: GPT +1%, Gemini -1.33%, nothing settled yet.
pub const USDJPY_SNAPSHOT: &str = r#"{
    "metadata": { "last_updated": "2026-10-17 07:00:00", "target_date": "2026-10-20" },
    "overall_stats": {
        "GPT-3.5": { "win_rate": 50.0, "avg_error": 0.8, "count": 12 },
        "Gemini": { "win_rate": 58.3, "avg_error": 0.65, "count": 12 }
    },
    "latest_forecast": {
        "current_prices": { "USD/JPY": 150.0 },
        "GPT": { "USD/JPY": 151.5 },
        "Gemini": { "USD/JPY": 148.0 }
    },
    "today_judgement": [],
    "market_status": {}
}"#;

/// Three assets with duplicate settlements for Nikkei 225.
pub const MULTI_ASSET_SNAPSHOT: &str = r#"{
    "metadata": { "last_updated": "2026-10-17 07:00:00", "target_date": "2026-10-20" },
    "overall_stats": {},
    "latest_forecast": {
        "current_prices": { "Nikkei 225": 38500.0, "S&P 500": 5800.0, "USD/JPY": 150.0 },
        "GPT": { "Nikkei 225": 38692.5, "S&P 500": 5800.0, "USD/JPY": 150.75 },
        "Gemini": { "Nikkei 225": 38400.0, "S&P 500": 5829.0, "USD/JPY": 150.1 }
    },
    "today_judgement": [
        {
            "asset_name": "Nikkei 225", "ai_model": "GPT-3.5", "date": "2026-10-14",
            "status": "settled", "direction_correct": false, "error_rate": 2.5,
            "predicted_price": 37000.0, "actual_price": 38000.0
        },
        {
            "asset_name": "Nikkei 225", "ai_model": "GPT-3.5", "date": "2026-10-16",
            "status": "settled", "direction_correct": true, "error_rate": 0.3,
            "predicted_price": 38400.0, "actual_price": 38515.0
        },
        {
            "asset_name": "Nikkei 225", "ai_model": "Gemini", "date": "2026-10-16",
            "status": "pending", "predicted_price": 38600.0
        }
    ],
    "market_status": {
        "S&P 500": { "is_open": false, "message": "Weekend" }
    }
}"#;
