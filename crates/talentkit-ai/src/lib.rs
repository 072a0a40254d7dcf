//! # TalentKit AI broker
//!
//! Central AI request broker for the TalentKit career platform. Feature
//! code (resume analysis, job matching, cover letters, interview prep)
//! renders its own prompts and parses its own result shapes; this crate
//! handles everything between prompt and parsed result:
//!
//! - **Credential rotation**: multiple API keys per provider, rotated per
//!   call, with exponential cooldown for rate-limited keys
//! - **Provider failover**: randomized ordering over the providers that
//!   still have usable credentials, with a bounded attempt budget
//! - **Response caching**: fingerprint-keyed, TTL-bounded, shared across
//!   callers
//! - **Tier budgets**: premium/basic input and output limits resolved per
//!   feature
//! - **Offline fallback**: deterministic, schema-valid placeholder
//!   results when every provider fails
//!
//! ## Example
//!
//! ```no_run
//! use talentkit_ai::config::BrokerConfig;
//! use talentkit_ai::llm::{
//!     complete_or_fallback, ChatMessage, CompletionRequest, FallbackRegistry, RequestBroker,
//! };
//! use talentkit_ai::tier::{FeatureKind, Tier};
//!
//! # async fn run() -> talentkit_ai::error::AiResult<()> {
//! let broker = RequestBroker::from_config(&BrokerConfig::from_env())?;
//! let registry = FallbackRegistry::builtin();
//!
//! let request = CompletionRequest::new(
//!     vec![
//!         ChatMessage::system("You are an expert resume reviewer. Respond with JSON."),
//!         ChatMessage::user("…resume text…"),
//!     ],
//!     Tier::Premium,
//!     FeatureKind::ResumeAnalysis,
//! );
//!
//! let result = complete_or_fallback(&broker, &registry, request).await?;
//! println!("{} ({:?}): {}", result.provider, result.source, result.content);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod tier;

pub use cache::{CacheStatistics, ResponseCache};
pub use config::{BrokerConfig, CacheSettings, ProviderSettings};
pub use error::{AiError, AiResult};
pub use llm::{
    complete_or_fallback, ChatMessage, CompletionRequest, CompletionResult, FallbackRegistry,
    RequestBroker, RequestBrokerBuilder, ResponseSource,
};
pub use tier::{FeatureKind, Tier, TierBudget, TierPolicy};
