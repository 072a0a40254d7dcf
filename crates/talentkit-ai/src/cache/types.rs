//! Cache entry types and fingerprinting

use crate::llm::messages::{ChatMessage, CompletionResult};
use crate::tier::{FeatureKind, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// A stored completion result with its insertion timestamp.
///
/// At most one entry exists per fingerprint; an entry past its TTL is
/// logically expired even while physically present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached result
    pub result: CompletionResult,
    /// When the entry was inserted
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(result: CompletionResult) -> Self {
        Self {
            result,
            created_at: Utc::now(),
        }
    }

    /// Check whether the entry is older than the given TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.created_at;
        age >= chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
    }
}

/// Cache hit/miss/eviction counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Number of entries currently stored (including logically expired ones)
    pub entry_count: usize,
    /// Number of fresh hits served
    pub hits: u64,
    /// Number of misses (absent or expired)
    pub misses: u64,
    /// Number of entries removed by expiry or capacity eviction
    pub evictions: u64,
}

impl CacheStatistics {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Compute the cache fingerprint for a request.
///
/// SHA-256 over the full normalized message content plus tier and feature.
/// Hashing the full content (never a truncated prefix) is load-bearing:
/// distinct long inputs sharing a prefix must never collide. The key is
/// content + tier only; caller identity does not participate, so identical
/// requests from different users share one entry.
pub fn fingerprint(messages: &[ChatMessage], tier: Tier, feature: FeatureKind) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(message.content.trim().as_bytes());
        hasher.update([0x1e]);
    }
    hasher.update(tier.as_str().as_bytes());
    hasher.update([0x1e]);
    hasher.update(feature.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
