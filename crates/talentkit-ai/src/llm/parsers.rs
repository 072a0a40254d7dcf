//! Response body parsing for chat-completion providers
//!
//! Both configured providers speak the OpenAI-compatible chat completions
//! shape, so one parser covers them.

use crate::error::{AiError, AiResult};
use crate::llm::messages::ProviderReply;
use serde_json::Value;

/// Extract a reply from an OpenAI-compatible chat completions body.
///
/// Expects `choices[0].message.content` to be a non-empty string; an empty
/// or absent content is a provider error, not a valid reply.
pub fn parse_chat_completion(provider: &str, body: Value) -> AiResult<ProviderReply> {
    let choice = &body["choices"][0];
    let content = choice["message"]["content"].as_str().unwrap_or("");

    if content.is_empty() {
        return Err(AiError::provider(
            provider,
            "response contained no message content",
        ));
    }

    Ok(ProviderReply {
        content: content.to_string(),
        model: body["model"].as_str().unwrap_or("unknown").to_string(),
        finish_reason: choice["finish_reason"].as_str().map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_completion_body() {
        let body = json!({
            "id": "chatcmpl-123",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"ok\":true}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        });

        let reply = parse_chat_completion("groq", body).unwrap();
        assert_eq!(reply.content, "{\"ok\":true}");
        assert_eq!(reply.model, "llama-3.3-70b-versatile");
        assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn missing_model_and_finish_reason_are_tolerated() {
        let body = json!({
            "choices": [{"message": {"content": "hello"}}]
        });

        let reply = parse_chat_completion("openrouter", body).unwrap();
        assert_eq!(reply.content, "hello");
        assert_eq!(reply.model, "unknown");
        assert!(reply.finish_reason.is_none());
    }

    #[test]
    fn empty_content_is_an_error() {
        let body = json!({
            "model": "m",
            "choices": [{"message": {"content": ""}, "finish_reason": "stop"}]
        });
        assert!(parse_chat_completion("groq", body).is_err());
    }

    #[test]
    fn missing_choices_is_an_error() {
        let body = json!({"model": "m"});
        assert!(parse_chat_completion("groq", body).is_err());
    }
}
