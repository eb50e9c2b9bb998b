pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

use crate::config::{LlmProviderKind, Settings};
use std::sync::Arc;

pub use prompt::PromptMessages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
}

/// Free-form text generation. Output is untrusted; see [`json::interpret_generation`].
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_text(&self, prompt: &PromptMessages) -> anyhow::Result<String>;
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    Ok(match settings.llm_provider {
        LlmProviderKind::Gemini => Arc::new(gemini::GeminiClient::from_settings(settings)?),
        LlmProviderKind::Anthropic => {
            Arc::new(anthropic::AnthropicClient::from_settings(settings)?)
        }
    })
}
