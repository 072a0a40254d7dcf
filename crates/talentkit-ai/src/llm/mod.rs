//! LLM broker: provider adapters, credential rotation, failover, fallback

pub mod broker;
pub mod credentials;
pub mod fallback;
pub mod messages;
pub mod parsers;
pub mod providers;
pub mod schema;


pub use broker::{RequestBroker, RequestBrokerBuilder};
pub use credentials::{Credential, CredentialPool, PoolOptions, PoolStatus, ReleaseOutcome};
pub use fallback::{complete_or_fallback, FallbackRegistry};
pub use messages::{
    ChatMessage, CompletionRequest, CompletionResult, MessageRole, ProviderReply, ResponseSource,
};
pub use providers::{ChatProvider, GroqProvider, OpenRouterProvider, ProviderInstance};
pub use schema::ResponseSchema;
