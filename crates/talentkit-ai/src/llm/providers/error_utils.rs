//! Provider error sanitization helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_ERROR_TEXT_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";

static BEARER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-+/=]{8,}").expect("valid bearer token regex")
});

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?token|refresh[_-]?token|token|secret|password|authorization|x-api-key)\b\s*[:=]\s*["']?[^"',\s}]+"#,
    )
    .expect("valid key/value secret regex")
});

/// Sanitize provider error text by redacting secrets and truncating large payloads.
///
/// Provider error bodies can echo back request headers or keys; anything
/// that ends up in our error messages must never carry key material.
pub fn sanitize_provider_error_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    if let Ok(mut json) = serde_json::from_str::<Value>(trimmed) {
        redact_json_value(&mut json);
        let serialized =
            serde_json::to_string(&json).unwrap_or_else(|_| "<unserializable error>".to_string());
        return truncate_with_suffix(serialized);
    }

    let redacted = redact_inline_secrets(trimmed);
    truncate_with_suffix(redacted)
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_json_value(item);
            }
        }
        Value::String(s) => {
            *s = redact_inline_secrets(s);
        }
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    normalized.contains("api_key")
        || normalized.contains("access_token")
        || normalized.contains("refresh_token")
        || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("authorization")
        || normalized.contains("cookie")
        || normalized.contains("private_key")
}

fn redact_inline_secrets(input: &str) -> String {
    let redacted_bearer = BEARER_TOKEN_RE.replace_all(input, "Bearer [REDACTED]");
    KEY_VALUE_SECRET_RE
        .replace_all(&redacted_bearer, "$1=[REDACTED]")
        .to_string()
}

fn truncate_with_suffix(text: String) -> String {
    if text.chars().count() <= MAX_ERROR_TEXT_CHARS {
        return text;
    }
    let truncated: String = text.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!("{truncated}... <truncated>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_tokens_in_plain_text() {
        let sanitized =
            sanitize_provider_error_text("request failed: Authorization: Bearer gsk_abcdef123456");
        assert!(!sanitized.contains("gsk_abcdef123456"));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_sensitive_json_fields() {
        let sanitized = sanitize_provider_error_text(
            r#"{"error": {"message": "bad key", "api_key": "gsk_secret_value"}}"#,
        );
        assert!(!sanitized.contains("gsk_secret_value"));
        assert!(sanitized.contains("bad key"));
    }

    #[test]
    fn truncates_oversized_bodies() {
        let sanitized = sanitize_provider_error_text(&"x".repeat(5_000));
        assert!(sanitized.len() < 2_000);
        assert!(sanitized.ends_with("<truncated>"));
    }

    #[test]
    fn empty_body_gets_placeholder() {
        assert_eq!(
            sanitize_provider_error_text("   "),
            "<empty error response body>"
        );
    }
}
