//! Request broker: cache check, credential rotation, provider failover
//!
//! One broker instance is built at process start and shared by every
//! feature. All collaborators are instance fields injected at construction
//! time; there is no global state.

use crate::cache::{fingerprint, CacheStatistics, ResponseCache};
use crate::config::{BrokerConfig, ProviderSettings};
use crate::error::{AiError, AiResult};
use crate::llm::credentials::{CredentialPool, PoolStatus, ReleaseOutcome};
use crate::llm::messages::{ChatMessage, CompletionRequest, CompletionResult};
use crate::llm::providers::{ChatProvider, GroqProvider, OpenRouterProvider, ProviderInstance};
use crate::llm::schema::ResponseSchema;
use crate::tier::TierPolicy;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

struct ProviderSlot {
    settings: ProviderSettings,
    pool: CredentialPool,
    client: Arc<dyn ChatProvider>,
}

/// The central request broker.
///
/// Owns one credential pool and one adapter per configured provider plus
/// the shared response cache. `complete` is safe to call concurrently from
/// any number of tasks.
pub struct RequestBroker {
    slots: Vec<ProviderSlot>,
    cache: ResponseCache,
    max_attempts: u32,
}

impl RequestBroker {
    /// Build a broker from validated configuration, constructing the real
    /// HTTP adapters for each configured provider.
    pub fn from_config(config: &BrokerConfig) -> AiResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::config(format!("failed to build HTTP client: {e}")))?;

        let mut builder = RequestBrokerBuilder::new()
            .with_cache(config.cache.clone())
            .with_max_attempts(config.max_attempts);

        for settings in &config.providers {
            let client: Arc<dyn ChatProvider> = match settings.name.as_str() {
                "groq" => Arc::new(ProviderInstance::Groq(GroqProvider::new(
                    settings.clone(),
                    http_client.clone(),
                ))),
                "openrouter" => Arc::new(ProviderInstance::OpenRouter(OpenRouterProvider::new(
                    settings.clone(),
                    http_client.clone(),
                ))),
                other => {
                    return Err(AiError::config(format!("unknown provider '{other}'")));
                }
            };
            builder = builder.with_provider(settings.clone(), client);
        }

        builder.build()
    }

    /// Serve one completion request.
    ///
    /// Order of operations: cache lookup, candidate selection (providers
    /// with at least one usable credential, shuffled), then up to
    /// `max_attempts` failover attempts. A fresh cache hit performs no
    /// network work at all.
    #[instrument(
        skip(self, request),
        fields(feature = request.feature.as_str(), tier = request.tier.as_str()),
        level = "debug"
    )]
    pub async fn complete(&self, mut request: CompletionRequest) -> AiResult<CompletionResult> {
        let started = Instant::now();
        let budget = TierPolicy::budget_for(request.tier, request.feature);
        clamp_input(&mut request.messages, budget.max_input_chars);

        let schema = match &request.schema {
            Some(doc) => Some(ResponseSchema::compile(doc)?),
            None => None,
        };

        let cache_key = if request.cacheable {
            Some(fingerprint(&request.messages, request.tier, request.feature))
        } else {
            None
        };

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key).await {
                debug!("serving completion from cache");
                return Ok(hit.into_cached());
            }
        }

        let mut candidates: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.slots[i].pool.status().available_keys > 0)
            .collect();
        if candidates.is_empty() {
            return Err(AiError::ProviderUnavailable);
        }
        candidates.shuffle(&mut rand::thread_rng());

        let mut attempts: u32 = 0;
        let mut last_error: Option<AiError> = None;

        for index in candidates {
            if attempts >= self.max_attempts {
                break;
            }

            if let Some(deadline) = request.deadline {
                if Instant::now() >= deadline {
                    return Err(AiError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }

            let slot = &self.slots[index];
            let Some(credential) = slot.pool.acquire() else {
                continue;
            };
            attempts += 1;

            let mut attempt_timeout = slot.settings.attempt_timeout();
            if let Some(deadline) = request.deadline {
                attempt_timeout = attempt_timeout.min(deadline.saturating_duration_since(Instant::now()));
            }

            let provider = slot.client.name();
            debug!(provider, attempt = attempts, "invoking provider");

            let outcome = tokio::time::timeout(
                attempt_timeout,
                slot.client.invoke(&request, &credential.key, &budget),
            )
            .await;

            match outcome {
                Err(_) => {
                    slot.pool.release(&credential, ReleaseOutcome::Errored);
                    let err = AiError::provider(
                        provider,
                        format!("attempt timed out after {}ms", attempt_timeout.as_millis()),
                    );
                    warn!(provider, "provider attempt timed out");
                    last_error = Some(err);
                }
                Ok(Err(err)) => {
                    let release = if err.is_rate_limited() {
                        ReleaseOutcome::RateLimited
                    } else {
                        ReleaseOutcome::Errored
                    };
                    slot.pool.release(&credential, release);
                    warn!(provider, error = %err, "provider attempt failed");
                    last_error = Some(err);
                }
                Ok(Ok(reply)) => {
                    if let Some(schema) = &schema {
                        if let Err(err) = schema.check(&reply.content) {
                            slot.pool.release(&credential, ReleaseOutcome::Errored);
                            warn!(provider, error = %err, "provider reply failed schema check");
                            last_error = Some(err);
                            continue;
                        }
                    }

                    slot.pool.release(&credential, ReleaseOutcome::Success);
                    let result = CompletionResult::live(provider, reply);
                    if let Some(key) = &cache_key {
                        self.cache.put(key, result.clone()).await;
                    }
                    debug!(provider, attempts, "completion served live");
                    return Ok(result);
                }
            }
        }

        Err(AiError::AllAttemptsExhausted {
            attempts,
            source: Box::new(last_error.unwrap_or(AiError::ProviderUnavailable)),
        })
    }

    /// Credential availability for one provider, for health reporting
    pub fn pool_status(&self, provider: &str) -> Option<PoolStatus> {
        self.slots
            .iter()
            .find(|slot| slot.settings.name == provider)
            .map(|slot| slot.pool.status())
    }

    /// Cache counters
    pub async fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics().await
    }

    /// Names of configured providers, in configuration order
    pub fn provider_names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .map(|slot| slot.settings.name.as_str())
            .collect()
    }
}

/// Builder for assembling a broker with injected providers.
///
/// `RequestBroker::from_config` covers production; the builder exists so
/// tests and embedders can supply their own `ChatProvider` implementations.
pub struct RequestBrokerBuilder {
    slots: Vec<ProviderSlot>,
    cache: crate::config::CacheSettings,
    max_attempts: u32,
}

impl RequestBrokerBuilder {
    /// Start an empty builder with default cache settings
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            cache: crate::config::CacheSettings::default(),
            max_attempts: 3,
        }
    }

    /// Add a provider with its settings and adapter; the credential pool is
    /// derived from the settings.
    pub fn with_provider(
        mut self,
        settings: ProviderSettings,
        client: Arc<dyn ChatProvider>,
    ) -> Self {
        let pool = CredentialPool::from_settings(&settings);
        self.slots.push(ProviderSlot {
            settings,
            pool,
            client,
        });
        self
    }

    /// Set cache settings
    pub fn with_cache(mut self, cache: crate::config::CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Set the failover attempt cap
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Assemble the broker
    pub fn build(self) -> AiResult<RequestBroker> {
        Ok(RequestBroker {
            slots: self.slots,
            cache: ResponseCache::new(&self.cache),
            max_attempts: self.max_attempts,
        })
    }
}

impl Default for RequestBrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate message content so the total character count stays within the
/// tier budget. Earlier messages (system prompts) keep priority; later
/// content is cut at a char boundary.
fn clamp_input(messages: &mut [ChatMessage], max_chars: usize) {
    let mut remaining = max_chars;
    for message in messages.iter_mut() {
        let len = message.content.chars().count();
        if len <= remaining {
            remaining -= len;
        } else {
            message.content = message.content.chars().take(remaining).collect();
            remaining = 0;
        }
    }
}
