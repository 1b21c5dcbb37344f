//! Chat relay: validate the visitor message, call the configured provider,
//! hand back the reply.
//!
//! Every failure is logged with full detail and answered with a short,
//! localized message. Provider bodies never reach the visitor.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ChatConfig;
use crate::llm::gemini::GeminiClient;
use crate::llm::openai::OpenAiClient;
use crate::llm::{ChatProvider, GenerationParams, Prompt, ProviderKind};
use crate::types::ProviderError;

/// Messages shorter than this (after trimming) are rejected.
pub const MIN_MESSAGE_CHARS: usize = 5;

const MSG_TOO_SHORT: &str = "メッセージは5文字以上でお願いします";
const MSG_NO_API_KEY: &str = "APIキーが設定されていません";
const MSG_NO_RESPONSE: &str = "AIからの応答を取得できませんでした";
const MSG_SERVER_ERROR: &str = "サーバーエラーが発生しました";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `POST /api/chat` body. `message` is optional so a missing field is a
/// validation failure rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message missing or shorter than {MIN_MESSAGE_CHARS} characters")]
    InvalidMessage,

    #[error("no API key for {provider} (env var {env})")]
    MissingApiKey { provider: ProviderKind, env: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::InvalidMessage => StatusCode::BAD_REQUEST,
            ChatError::MissingApiKey { .. } | ChatError::Provider(_) | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// What the visitor sees.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::InvalidMessage => MSG_TOO_SHORT,
            ChatError::MissingApiKey { .. } => MSG_NO_API_KEY,
            ChatError::Provider(_) => MSG_NO_RESPONSE,
            ChatError::Internal(_) => MSG_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.user_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Stateless chat relay. Each `reply` is independent: one provider call,
/// no retries, no history.
pub struct ChatService {
    provider: Option<Arc<dyn ChatProvider>>,
    kind: ProviderKind,
    key_env: String,
    params: GenerationParams,
}

impl ChatService {
    /// A service backed by `provider`.
    pub fn new(provider: Arc<dyn ChatProvider>, kind: ProviderKind) -> Self {
        Self {
            provider: Some(provider),
            kind,
            key_env: String::new(),
            params: GenerationParams::CHAT,
        }
    }

    /// A service whose provider key is missing. Every valid request fails
    /// with a configuration error until the key is supplied and the
    /// process restarted.
    pub fn unconfigured(kind: ProviderKind, key_env: impl Into<String>) -> Self {
        Self {
            provider: None,
            kind,
            key_env: key_env.into(),
            params: GenerationParams::CHAT,
        }
    }

    /// Build the provider selected in config.
    pub fn from_config(cfg: &ChatConfig) -> anyhow::Result<Self> {
        let Some(key) = cfg.resolve_api_key() else {
            warn!(
                provider = %cfg.provider,
                env = cfg.api_key_env(),
                "No chat API key configured; /api/chat will answer 500"
            );
            return Ok(Self::unconfigured(cfg.provider, cfg.api_key_env()));
        };

        let provider: Arc<dyn ChatProvider> = match cfg.provider {
            ProviderKind::Gemini => {
                Arc::new(GeminiClient::new(key, cfg.model.clone(), cfg.timeout())?)
            }
            ProviderKind::OpenAi => {
                Arc::new(OpenAiClient::new(key, cfg.model.clone(), cfg.timeout())?)
            }
        };
        info!(
            provider = provider.name(),
            model = %provider.model_name(),
            "Chat provider ready"
        );
        Ok(Self::new(provider, cfg.provider))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Accept a message whose trimmed length is at least `MIN_MESSAGE_CHARS`
    /// characters (not bytes).
    pub fn validate(message: Option<&str>) -> Result<&str, ChatError> {
        match message {
            Some(m) if m.trim().chars().count() >= MIN_MESSAGE_CHARS => Ok(m),
            _ => Err(ChatError::InvalidMessage),
        }
    }

    /// Relay one visitor message and return the provider's text unaltered.
    pub async fn reply(&self, message: Option<&str>) -> Result<String, ChatError> {
        let message = Self::validate(message)?;

        let Some(provider) = &self.provider else {
            error!(
                provider = %self.kind,
                env = %self.key_env,
                "Chat request rejected: provider API key not set"
            );
            return Err(ChatError::MissingApiKey {
                provider: self.kind,
                env: self.key_env.clone(),
            });
        };

        let prompt = Prompt::concierge(message);
        match provider.generate(&prompt, &self.params).await {
            Ok(text) => {
                info!(
                    provider = provider.name(),
                    chars = text.chars().count(),
                    "Chat reply generated"
                );
                Ok(text)
            }
            Err(e) => {
                error!(provider = provider.name(), error = %e, "Chat provider call failed");
                Err(ChatError::Provider(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
