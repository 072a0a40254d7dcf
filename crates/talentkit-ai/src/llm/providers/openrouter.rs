//! OpenRouter provider implementation

use crate::config::ProviderSettings;
use crate::error::{AiError, AiResult};
use crate::llm::messages::{CompletionRequest, ProviderReply};
use crate::llm::parsers::parse_chat_completion;
use crate::llm::providers::error_utils::sanitize_provider_error_text;
use crate::tier::TierBudget;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// OpenRouter chat completions adapter (OpenAI-compatible wire format)
pub struct OpenRouterProvider {
    settings: ProviderSettings,
    http_client: Client,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider
    pub fn new(settings: ProviderSettings, http_client: Client) -> Self {
        Self {
            settings,
            http_client,
        }
    }

    /// OpenRouter chat completion with a per-call rotated key
    #[instrument(skip(self, request, api_key, budget), level = "debug")]
    pub async fn chat(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        budget: &TierBudget,
    ) -> AiResult<ProviderReply> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let model = self.settings.model_for(request.tier);

        let max_tokens = request
            .max_tokens
            .unwrap_or(budget.max_output_tokens)
            .min(budget.max_output_tokens);

        let mut request_body = json!({
            "model": model,
            "messages": request.messages,
            "max_tokens": max_tokens,
        });
        if let Some(temperature) = request.temperature {
            request_body["temperature"] = json!(temperature);
        }

        debug!(model, max_tokens, "sending openrouter chat completion");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AiError::provider("openrouter", format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::provider_status(
                "openrouter",
                status.as_u16(),
                sanitize_provider_error_text(&error_text),
            ));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AiError::provider("openrouter", format!("invalid response body: {e}")))?;

        parse_chat_completion("openrouter", response_json)
    }
}
