//! LLM provider adapters
//!
//! Each provider is a thin adapter over its HTTP API; all key rotation,
//! failover, caching, and schema enforcement live in the broker.

mod error_utils;
mod groq;
mod openrouter;

pub use error_utils::sanitize_provider_error_text;
pub use groq::GroqProvider;
pub use openrouter::OpenRouterProvider;

use crate::error::AiResult;
use crate::llm::messages::{CompletionRequest, ProviderReply};
use crate::tier::TierBudget;
use async_trait::async_trait;

/// Unified trait for all chat-completion providers.
///
/// The API key is a per-call argument, not provider state: the broker
/// rotates keys between attempts.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable provider name, matching `ProviderSettings::name`
    fn name(&self) -> &str;

    /// Perform one chat completion attempt
    async fn invoke(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        budget: &TierBudget,
    ) -> AiResult<ProviderReply>;
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn invoke(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        budget: &TierBudget,
    ) -> AiResult<ProviderReply> {
        self.chat(request, api_key, budget).await
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn invoke(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        budget: &TierBudget,
    ) -> AiResult<ProviderReply> {
        self.chat(request, api_key, budget).await
    }
}

/// Unified provider enum wrapping the concrete adapters
pub enum ProviderInstance {
    /// Groq adapter
    Groq(GroqProvider),
    /// OpenRouter adapter
    OpenRouter(OpenRouterProvider),
}

#[async_trait]
impl ChatProvider for ProviderInstance {
    fn name(&self) -> &str {
        match self {
            Self::Groq(p) => p.name(),
            Self::OpenRouter(p) => p.name(),
        }
    }

    async fn invoke(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        budget: &TierBudget,
    ) -> AiResult<ProviderReply> {
        match self {
            Self::Groq(p) => p.invoke(request, api_key, budget).await,
            Self::OpenRouter(p) => p.invoke(request, api_key, budget).await,
        }
    }
}
