//! Broker configuration
//!
//! All broker state is process-lifetime only: key lists are loaded once at
//! startup (from the environment or an embedding application's config
//! file), the cache starts cold, and every credential starts un-exhausted.

use crate::error::{AiError, AiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-attempt timeout in seconds
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 20;
/// Default response cache TTL in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default hard cap on cache entries
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Settings for one upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name ("groq", "openrouter")
    pub name: String,
    /// API endpoint base URL
    pub base_url: String,
    /// API keys rotated across requests
    pub api_keys: Vec<String>,
    /// Model id used for premium-tier requests
    pub premium_model: String,
    /// Model id used for basic-tier requests
    pub basic_model: String,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
    /// Short-window call budget per key (calls per minute)
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute_per_key: u32,
    /// Base cooldown after a rate-limited key, in seconds
    #[serde(default = "default_cooldown_base")]
    pub cooldown_base_secs: u64,
    /// Cooldown cap, in seconds
    #[serde(default = "default_cooldown_max")]
    pub cooldown_max_secs: u64,
}

fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_SECS
}

fn default_calls_per_minute() -> u32 {
    30
}

fn default_cooldown_base() -> u64 {
    2
}

fn default_cooldown_max() -> u64 {
    300
}

impl ProviderSettings {
    /// Default Groq settings with the given keys
    pub fn groq(api_keys: Vec<String>) -> Self {
        Self {
            name: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_keys,
            premium_model: "llama-3.3-70b-versatile".to_string(),
            basic_model: "llama-3.3-70b-versatile".to_string(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            calls_per_minute_per_key: default_calls_per_minute(),
            cooldown_base_secs: default_cooldown_base(),
            cooldown_max_secs: default_cooldown_max(),
        }
    }

    /// Default OpenRouter settings with the given keys
    pub fn openrouter(api_keys: Vec<String>) -> Self {
        Self {
            name: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_keys,
            premium_model: "mistralai/mistral-small-2402".to_string(),
            basic_model: "mistralai/mistral-small-2402".to_string(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            calls_per_minute_per_key: default_calls_per_minute(),
            cooldown_base_secs: default_cooldown_base(),
            cooldown_max_secs: default_cooldown_max(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-attempt timeout
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set the per-key short-window call budget
    pub fn with_calls_per_minute(mut self, calls: u32) -> Self {
        self.calls_per_minute_per_key = calls;
        self
    }

    /// Model id for the given tier
    pub fn model_for(&self, tier: crate::tier::Tier) -> &str {
        match tier {
            crate::tier::Tier::Premium => &self.premium_model,
            crate::tier::Tier::Basic => &self.basic_model,
        }
    }

    /// Per-attempt timeout as a `Duration`
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    fn validate(&self) -> AiResult<()> {
        if self.name.trim().is_empty() {
            return Err(AiError::config("provider name must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(AiError::config(format!(
                "provider '{}': base_url must not be empty",
                self.name
            )));
        }
        if self.api_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(AiError::config(format!(
                "provider '{}': api_keys must not contain empty strings",
                self.name
            )));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(AiError::config(format!(
                "provider '{}': attempt_timeout_secs must be positive",
                self.name
            )));
        }
        if self.premium_model.trim().is_empty() || self.basic_model.trim().is_empty() {
            return Err(AiError::config(format!(
                "provider '{}': model ids must not be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live for cached results, in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Hard cap on entry count
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// Entry count that triggers opportunistic eviction
    #[serde(default = "default_cache_high_water")]
    pub high_water: usize,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_cache_high_water() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES + 64
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            high_water: default_cache_high_water(),
        }
    }
}

impl CacheSettings {
    /// TTL as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Configured providers, each with its own key pool
    pub providers: Vec<ProviderSettings>,
    /// Shared response cache settings
    #[serde(default)]
    pub cache: CacheSettings,
    /// Maximum failover attempts per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            cache: CacheSettings::default(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl BrokerConfig {
    /// Build a configuration from environment variables.
    ///
    /// Reads `GROQ_API_KEYS` and `OPENROUTER_API_KEYS` as comma-separated
    /// key lists, plus optional `GROQ_BASE_URL` / `OPENROUTER_BASE_URL`
    /// overrides. Providers with no keys configured are omitted; a broker
    /// built from an empty provider list serves only cached and fallback
    /// results.
    pub fn from_env() -> Self {
        let mut providers = Vec::new();

        if let Some(keys) = env_key_list("GROQ_API_KEYS") {
            let mut settings = ProviderSettings::groq(keys);
            if let Ok(url) = std::env::var("GROQ_BASE_URL") {
                settings.base_url = url;
            }
            providers.push(settings);
        }

        if let Some(keys) = env_key_list("OPENROUTER_API_KEYS") {
            let mut settings = ProviderSettings::openrouter(keys);
            if let Ok(url) = std::env::var("OPENROUTER_BASE_URL") {
                settings.base_url = url;
            }
            providers.push(settings);
        }

        Self {
            providers,
            ..Self::default()
        }
    }

    /// Add a provider
    pub fn with_provider(mut self, settings: ProviderSettings) -> Self {
        self.providers.push(settings);
        self
    }

    /// Set cache settings
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Set the failover attempt cap
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> AiResult<()> {
        for settings in &self.providers {
            settings.validate()?;
        }
        let mut names: Vec<&str> = self.providers.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.providers.len() {
            return Err(AiError::config("duplicate provider names"));
        }
        if self.max_attempts == 0 {
            return Err(AiError::config("max_attempts must be positive"));
        }
        if self.cache.high_water < self.cache.max_entries {
            return Err(AiError::config(
                "cache high_water must be at least max_entries",
            ));
        }
        Ok(())
    }
}

fn env_key_list(var: &str) -> Option<Vec<String>> {
    let raw = std::env::var(var).ok()?;
    let keys: Vec<String> = raw
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        None
    } else {
        Some(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(BrokerConfig::default().validate().is_ok());
    }

    #[test]
    fn groq_defaults() {
        let settings = ProviderSettings::groq(vec!["gsk_test".to_string()]);
        assert_eq!(settings.name, "groq");
        assert!(settings.base_url.contains("groq.com"));
        assert_eq!(
            settings.model_for(crate::tier::Tier::Premium),
            "llama-3.3-70b-versatile"
        );
    }

    #[test]
    fn rejects_empty_key_strings() {
        let config = BrokerConfig::default()
            .with_provider(ProviderSettings::groq(vec![String::new()]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_provider_names() {
        let config = BrokerConfig::default()
            .with_provider(ProviderSettings::groq(vec!["a".to_string()]))
            .with_provider(ProviderSettings::groq(vec!["b".to_string()]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_cache_watermarks() {
        let config = BrokerConfig::default().with_cache(CacheSettings {
            ttl_secs: 60,
            max_entries: 100,
            high_water: 10,
        });
        assert!(config.validate().is_err());
    }
}
