//! Generative-language providers for the site chat.
//!
//! Defines the `ChatProvider` trait, the fixed sales-concierge prompt and
//! generation parameters, and the implementations for Gemini and OpenAI.

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::types::ProviderError;

/// Sampling parameters sent with every chat completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    /// The parameters the chat endpoint always uses.
    pub const CHAT: GenerationParams = GenerationParams {
        temperature: 0.7,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    };
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::CHAT
    }
}

/// The system prompt for the sales concierge.
///
/// Every answer must close by pointing the visitor at the contact form.
pub const SYSTEM_PROMPT: &str = "あなたはEnzoWorksの公式営業コンシェルジュです。\n\n\
お客様のご相談やお悩みが、EnzoWorksの業務で解決できる可能性があることを、\
Webサイトに掲げた「8つの価値」の視点を交えながら具体的に提案してください。\n\n\
業務内容：Webサービス開発、デザイン、AI活用コンサルティング、業務効率化、\
楽曲制作、動画制作、セミナー登壇、その他まだ形になっていないご相談\n\n\
回答の最後には必ず「より具体的なご相談や戦略立案は、下記のお問い合わせフォームからお送りください」\
と添え、/contact のお問い合わせフォームへ誘導してください。";

/// A chat prompt: the fixed system prompt plus the visitor's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Wrap a visitor message with the concierge system prompt.
    pub fn concierge(user_message: &str) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: user_message.to_string(),
        }
    }

    /// Single-text form for providers without a system role:
    /// the system prompt followed by the labelled user message.
    pub fn combined(&self) -> String {
        format!("{}\n\nユーザーのメッセージ: {}", self.system, self.user)
    }
}

/// Which provider serves the chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(alias = "gpt")]
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Abstraction over generative-language chat providers.
///
/// One call, no retries, no history. Implementors log provider detail
/// and return a `ProviderError`; they never panic on a bad response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Model identifier string.
    fn model_name(&self) -> String;
}
