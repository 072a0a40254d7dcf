//! Error types for the AI broker

use thiserror::Error;

/// Result type alias for broker operations
pub type AiResult<T> = Result<T, AiError>;

/// Main error type for the AI broker.
///
/// `Provider` and `SchemaMismatch` are attempt-level failures: the broker
/// recovers from them locally by advancing to the next failover candidate.
/// `ProviderUnavailable` and `AllAttemptsExhausted` are request-level and
/// surface to the caller unless a fallback generator is registered for the
/// requested feature.
#[derive(Error, Debug, Clone)]
pub enum AiError {
    /// No provider has a usable credential right now
    #[error("no AI provider has an available credential")]
    ProviderUnavailable,

    /// Every failover attempt failed
    #[error("all {attempts} provider attempts failed: {source}")]
    AllAttemptsExhausted {
        attempts: u32,
        #[source]
        source: Box<AiError>,
    },

    /// A single provider attempt failed (network, timeout, non-success status)
    #[error("provider '{provider}' error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Provider returned a success status but the body failed structural validation
    #[error("response failed schema validation: {message}")]
    SchemaMismatch { message: String },

    /// The caller's deadline elapsed before a result could be produced
    #[error("request deadline exceeded after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Configuration related errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },
}

impl AiError {
    /// Create a provider attempt error without a status code
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a provider attempt error carrying an HTTP status code
    pub fn provider_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check whether this attempt failure indicates the credential was
    /// rate limited or out of quota, as opposed to an ordinary error.
    ///
    /// Drives the credential cooldown: rate-limited keys back off
    /// exponentially, ordinary errors only bump the failure counter.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Provider {
                status, message, ..
            } => {
                if matches!(status, Some(429) | Some(403)) {
                    return true;
                }
                let msg = message.to_lowercase();
                msg.contains("429")
                    || msg.contains("rate limit")
                    || msg.contains("quota")
                    || msg.contains("insufficient")
                    || msg.contains("exceeded")
            }
            _ => false,
        }
    }

    /// Check whether the request as a whole can still be rescued by a
    /// registered fallback generator.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable | Self::AllAttemptsExhausted { .. }
        )
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detected_from_status() {
        let err = AiError::provider_status("groq", 429, "Too Many Requests");
        assert!(err.is_rate_limited());

        let err = AiError::provider_status("groq", 500, "Internal Server Error");
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn rate_limit_detected_from_message() {
        let err = AiError::provider("openrouter", "monthly quota exceeded");
        assert!(err.is_rate_limited());

        let err = AiError::provider("openrouter", "connection reset by peer");
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn fallback_eligibility() {
        assert!(AiError::ProviderUnavailable.is_fallback_eligible());
        let exhausted = AiError::AllAttemptsExhausted {
            attempts: 2,
            source: Box::new(AiError::provider("groq", "boom")),
        };
        assert!(exhausted.is_fallback_eligible());
        assert!(!AiError::schema_mismatch("bad shape").is_fallback_eligible());
        assert!(!AiError::Timeout { elapsed_ms: 100 }.is_fallback_eligible());
    }
}
