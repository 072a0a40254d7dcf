//! Chat message and completion types

use crate::tier::{FeatureKind, Tier};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message (rendered prompt)
    User,
    /// Assistant message (prior AI output)
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the completion conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One completion request handed to the broker by feature code.
///
/// Feature code owns prompt rendering and result-shape parsing; the broker
/// is shape-agnostic except for the optional schema check.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered conversation messages
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Requested completion tokens; clamped to the tier budget
    pub max_tokens: Option<u32>,
    /// Caller's subscription tier
    pub tier: Tier,
    /// Feature this request serves (budgeting, cache keying, fallback routing)
    pub feature: FeatureKind,
    /// Whether the result may be served from / written to the shared cache
    pub cacheable: bool,
    /// Optional JSON schema the response body must validate against
    pub schema: Option<serde_json::Value>,
    /// Caller patience budget; attempts past this point are abandoned
    pub deadline: Option<Instant>,
}

impl CompletionRequest {
    /// Create a new request with defaults: cacheable, no schema, no deadline
    pub fn new(messages: Vec<ChatMessage>, tier: Tier, feature: FeatureKind) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            tier,
            feature,
            cacheable: true,
            schema: None,
            deadline: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the requested completion tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Disable caching for this request
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Require the response body to validate against a JSON schema
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Abort failover once this deadline passes
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Raw reply from one provider attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    /// Response content
    pub content: String,
    /// Model that produced the response, as reported by the provider
    pub model: String,
    /// Finish reason, if reported
    pub finish_reason: Option<String>,
}

/// Where a completion result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Produced by a live provider call
    Live,
    /// Served from the shared response cache
    Cached,
    /// Synthesized offline by a fallback generator
    Fallback,
}

/// Uniform completion result, regardless of how it was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Provider that produced the content ("offline" for fallbacks)
    pub provider: String,
    /// Model that produced the content ("fallback" for fallbacks)
    pub model: String,
    /// Raw response content
    pub content: String,
    /// Provenance of the result
    pub source: ResponseSource,
}

impl CompletionResult {
    /// Build a live result from a provider reply
    pub fn live(provider: impl Into<String>, reply: ProviderReply) -> Self {
        Self {
            provider: provider.into(),
            model: reply.model,
            content: reply.content,
            source: ResponseSource::Live,
        }
    }

    /// Re-tag a stored result as served from cache
    pub fn into_cached(mut self) -> Self {
        self.source = ResponseSource::Cached;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, MessageRole::System);
        assert_eq!(ChatMessage::user("u").role, MessageRole::User);
        assert_eq!(ChatMessage::assistant("a").role, MessageRole::Assistant);
    }

    #[test]
    fn request_builder_defaults() {
        let request = CompletionRequest::new(
            vec![ChatMessage::user("ping")],
            Tier::Basic,
            FeatureKind::JobMatch,
        );
        assert!(request.cacheable);
        assert!(request.schema.is_none());
        assert!(request.deadline.is_none());

        let request = request.uncached().with_temperature(0.2);
        assert!(!request.cacheable);
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn source_serializes_lowercase() {
        let json = serde_json::to_string(&ResponseSource::Cached).unwrap();
        assert_eq!(json, "\"cached\"");
    }
}
