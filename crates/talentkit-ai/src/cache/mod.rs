//! Shared response cache
//!
//! Fingerprint-keyed, TTL-bounded store shared across all in-flight
//! requests. Repeated requests for the same normalized input (identical
//! resume text re-analyzed within minutes, say) are common and expensive to
//! recompute, so the cache sits in front of every provider attempt.
//!
//! Eviction is insertion-ordered, not access-ordered: when the entry count
//! crosses the high-water mark the store first drops everything logically
//! expired, then drops oldest-inserted entries until back at the hard cap.

pub mod types;

#[cfg(test)]
mod tests;

pub use types::{fingerprint, CacheEntry, CacheStatistics};

use crate::config::CacheSettings;
use crate::llm::messages::CompletionResult;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Fingerprints in insertion order, oldest first
    order: VecDeque<String>,
    stats: CacheStatistics,
}

/// TTL-bounded response cache keyed by request fingerprint
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    max_entries: usize,
    high_water: usize,
}

impl ResponseCache {
    /// Create a cache from settings
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            ttl: settings.ttl(),
            max_entries: settings.max_entries.max(1),
            high_water: settings.high_water.max(settings.max_entries.max(1)),
        }
    }

    /// Create a cache with an explicit TTL and hard cap, mostly for tests
    pub fn with_limits(ttl: Duration, max_entries: usize, high_water: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            ttl,
            max_entries: max_entries.max(1),
            high_water: high_water.max(max_entries.max(1)),
        }
    }

    /// Look up a fingerprint. Returns the stored result only while fresh;
    /// expired entries count as misses and are dropped on observation.
    pub async fn get(&self, fingerprint: &str) -> Option<CompletionResult> {
        let mut inner = self.inner.lock().await;
        match inner.entries.get(fingerprint) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                let result = entry.result.clone();
                inner.stats.hits += 1;
                Some(result)
            }
            Some(_) => {
                inner.entries.remove(fingerprint);
                inner.order.retain(|fp| fp != fingerprint);
                inner.stats.evictions += 1;
                inner.stats.misses += 1;
                inner.stats.entry_count = inner.entries.len();
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite the entry for a fingerprint. An overwrite counts
    /// as a fresh insertion for eviction ordering.
    pub async fn put(&self, fingerprint: &str, result: CompletionResult) {
        let mut inner = self.inner.lock().await;
        if inner.entries.contains_key(fingerprint) {
            inner.order.retain(|fp| fp != fingerprint);
        }
        inner
            .entries
            .insert(fingerprint.to_string(), CacheEntry::new(result));
        inner.order.push_back(fingerprint.to_string());
        inner.stats.entry_count = inner.entries.len();

        if inner.entries.len() > self.high_water {
            self.evict_locked(&mut inner);
        }
    }

    /// Force an eviction pass
    pub async fn evict(&self) {
        let mut inner = self.inner.lock().await;
        self.evict_locked(&mut inner);
    }

    /// Current counters
    pub async fn statistics(&self) -> CacheStatistics {
        self.inner.lock().await.stats.clone()
    }

    /// Drop everything
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.order.clear();
        inner.stats.entry_count = 0;
    }

    fn evict_locked(&self, inner: &mut CacheInner) {
        // Expired entries first
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(fp, _)| fp.clone())
            .collect();
        for fp in &expired {
            inner.entries.remove(fp);
            inner.stats.evictions += 1;
        }
        if !expired.is_empty() {
            inner.order.retain(|fp| inner.entries.contains_key(fp));
        }

        // Still over the hard cap: oldest-inserted entries go next
        while inner.entries.len() > self.max_entries {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&oldest).is_some() {
                inner.stats.evictions += 1;
            }
        }

        inner.stats.entry_count = inner.entries.len();
        debug!(
            entries = inner.entries.len(),
            evictions = inner.stats.evictions,
            "cache eviction pass complete"
        );
    }
}
