//! Per-provider credential pool
//!
//! Owns a provider's API keys and tracks their availability: a short-window
//! call budget per key plus an exponential cooldown after rate limiting.
//! This is a best-effort limiter, not a hard quota enforcer: a race
//! between a lookup and a release can only soft-overuse a nearly-exhausted
//! key, never corrupt state, because every transition happens under one
//! mutex.

use crate::config::ProviderSettings;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CALL_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one provider attempt, reported back to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The attempt succeeded
    Success,
    /// The provider rate limited or quota-blocked the key
    RateLimited,
    /// The attempt failed for any other reason
    Errored,
}

/// A leased API key
#[derive(Debug, Clone)]
pub struct Credential {
    /// Provider this key belongs to
    pub provider: String,
    /// The key material
    pub key: String,
    /// Slot index inside the pool
    index: usize,
}

/// Pool availability snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Configured keys
    pub total_keys: usize,
    /// Keys currently usable (not cooling down, under the window budget)
    pub available_keys: usize,
}

/// Tuning knobs for a pool, split out so tests can shrink the durations
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Short-window call budget per key; 0 disables the window check
    pub calls_per_minute: u32,
    /// Base cooldown applied after the first rate limit
    pub cooldown_base: Duration,
    /// Cooldown cap
    pub cooldown_max: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            calls_per_minute: 30,
            cooldown_base: Duration::from_secs(2),
            cooldown_max: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct KeyState {
    key: String,
    exhausted_until: Option<Instant>,
    consecutive_failures: u32,
    window_started: Instant,
    calls_in_window: u32,
}

impl KeyState {
    fn new(key: String) -> Self {
        Self {
            key,
            exhausted_until: None,
            consecutive_failures: 0,
            window_started: Instant::now(),
            calls_in_window: 0,
        }
    }

    fn is_usable(&self, now: Instant, calls_per_minute: u32) -> bool {
        if let Some(until) = self.exhausted_until {
            if now < until {
                return false;
            }
        }
        if calls_per_minute == 0 {
            return true;
        }
        // A stale window means the budget is fresh
        now.duration_since(self.window_started) >= CALL_WINDOW
            || self.calls_in_window < calls_per_minute
    }

    fn consume_call(&mut self, now: Instant) {
        if now.duration_since(self.window_started) >= CALL_WINDOW {
            self.window_started = now;
            self.calls_in_window = 0;
        }
        self.calls_in_window += 1;
    }
}

#[derive(Debug)]
struct PoolInner {
    keys: Vec<KeyState>,
    /// Next slot to try first, for rotation fairness
    cursor: usize,
}

/// Thread-safe pool of one provider's credentials
#[derive(Debug)]
pub struct CredentialPool {
    provider: String,
    options: PoolOptions,
    inner: Mutex<PoolInner>,
}

impl CredentialPool {
    /// Create a pool from explicit keys and options
    pub fn new(provider: impl Into<String>, keys: Vec<String>, options: PoolOptions) -> Self {
        Self {
            provider: provider.into(),
            options,
            inner: Mutex::new(PoolInner {
                keys: keys.into_iter().map(KeyState::new).collect(),
                cursor: 0,
            }),
        }
    }

    /// Create a pool from provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            settings.name.clone(),
            settings.api_keys.clone(),
            PoolOptions {
                calls_per_minute: settings.calls_per_minute_per_key,
                cooldown_base: Duration::from_secs(settings.cooldown_base_secs),
                cooldown_max: Duration::from_secs(settings.cooldown_max_secs),
            },
        )
    }

    /// Provider this pool belongs to
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Lease a usable credential, or `None` if every key is cooling down or
    /// over its window budget. Scans from a rotation cursor so consecutive
    /// requests spread across keys.
    pub fn acquire(&self) -> Option<Credential> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let total = inner.keys.len();
        if total == 0 {
            return None;
        }

        for offset in 0..total {
            let index = (inner.cursor + offset) % total;
            if inner.keys[index].is_usable(now, self.options.calls_per_minute) {
                inner.keys[index].consume_call(now);
                inner.cursor = (index + 1) % total;
                let key = inner.keys[index].key.clone();
                debug!(provider = %self.provider, slot = index, "credential acquired");
                return Some(Credential {
                    provider: self.provider.clone(),
                    key,
                    index,
                });
            }
        }

        debug!(provider = %self.provider, "no usable credential");
        None
    }

    /// Report the outcome of an attempt made with a leased credential.
    ///
    /// `RateLimited` puts the key into cooldown with exponential backoff
    /// (base * 2^(consecutive_failures - 1), capped); `Errored` only bumps
    /// the failure counter so a later rate limit backs off longer;
    /// `Success` resets the key completely.
    pub fn release(&self, credential: &Credential, outcome: ReleaseOutcome) {
        let mut inner = self.inner.lock();
        let Some(state) = inner.keys.get_mut(credential.index) else {
            return;
        };

        match outcome {
            ReleaseOutcome::Success => {
                state.consecutive_failures = 0;
                state.exhausted_until = None;
            }
            ReleaseOutcome::RateLimited => {
                state.consecutive_failures += 1;
                let exponent = state.consecutive_failures.saturating_sub(1).min(16);
                let backoff = self
                    .options
                    .cooldown_base
                    .saturating_mul(1 << exponent)
                    .min(self.options.cooldown_max);
                state.exhausted_until = Some(Instant::now() + backoff);
                warn!(
                    provider = %self.provider,
                    slot = credential.index,
                    failures = state.consecutive_failures,
                    backoff_ms = backoff.as_millis() as u64,
                    "credential rate limited, entering cooldown"
                );
            }
            ReleaseOutcome::Errored => {
                state.consecutive_failures += 1;
            }
        }
    }

    /// Availability snapshot without touching rotation state
    pub fn status(&self) -> PoolStatus {
        let now = Instant::now();
        let inner = self.inner.lock();
        let available = inner
            .keys
            .iter()
            .filter(|k| k.is_usable(now, self.options.calls_per_minute))
            .count();
        PoolStatus {
            total_keys: inner.keys.len(),
            available_keys: available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(keys: &[&str], options: PoolOptions) -> CredentialPool {
        CredentialPool::new(
            "groq",
            keys.iter().map(|k| k.to_string()).collect(),
            options,
        )
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let pool = pool_with(&[], PoolOptions::default());
        assert!(pool.acquire().is_none());
        assert_eq!(
            pool.status(),
            PoolStatus {
                total_keys: 0,
                available_keys: 0
            }
        );
    }

    #[test]
    fn rotation_spreads_across_keys() {
        let pool = pool_with(&["k1", "k2"], PoolOptions::default());
        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn rate_limited_key_enters_cooldown_and_recovers() {
        let pool = pool_with(
            &["k1"],
            PoolOptions {
                calls_per_minute: 0,
                cooldown_base: Duration::from_millis(40),
                cooldown_max: Duration::from_secs(1),
            },
        );

        let credential = pool.acquire().unwrap();
        pool.release(&credential, ReleaseOutcome::RateLimited);

        // Refused immediately after
        assert!(pool.acquire().is_none());
        assert_eq!(pool.status().available_keys, 0);

        // Accepted once the cooldown elapses
        std::thread::sleep(Duration::from_millis(60));
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn backoff_grows_and_success_resets() {
        let pool = pool_with(
            &["k1"],
            PoolOptions {
                calls_per_minute: 0,
                cooldown_base: Duration::from_millis(20),
                cooldown_max: Duration::from_millis(500),
            },
        );

        // Two consecutive rate limits: second cooldown is longer than the first.
        let credential = pool.acquire().unwrap();
        pool.release(&credential, ReleaseOutcome::RateLimited);
        std::thread::sleep(Duration::from_millis(30));

        let credential = pool.acquire().unwrap();
        pool.release(&credential, ReleaseOutcome::RateLimited);
        // 40ms backoff now; 30ms is not enough
        std::thread::sleep(Duration::from_millis(30));
        assert!(pool.acquire().is_none());
        std::thread::sleep(Duration::from_millis(20));

        let credential = pool.acquire().unwrap();
        pool.release(&credential, ReleaseOutcome::Success);

        // Reset: next rate limit starts from the base cooldown again
        let credential = pool.acquire().unwrap();
        pool.release(&credential, ReleaseOutcome::RateLimited);
        std::thread::sleep(Duration::from_millis(30));
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn window_budget_limits_calls() {
        let pool = pool_with(
            &["k1"],
            PoolOptions {
                calls_per_minute: 2,
                cooldown_base: Duration::from_millis(10),
                cooldown_max: Duration::from_secs(1),
            },
        );

        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.status().available_keys, 0);
        assert_eq!(pool.status().total_keys, 1);
    }

    #[test]
    fn status_does_not_consume_budget() {
        let pool = pool_with(
            &["k1"],
            PoolOptions {
                calls_per_minute: 1,
                ..PoolOptions::default()
            },
        );

        for _ in 0..10 {
            assert_eq!(pool.status().available_keys, 1);
        }
        assert!(pool.acquire().is_some());
        assert_eq!(pool.status().available_keys, 0);
    }

    #[test]
    fn concurrent_acquire_release_is_safe() {
        use std::sync::Arc;

        let pool = Arc::new(pool_with(
            &["k1", "k2", "k3"],
            PoolOptions {
                calls_per_minute: 0,
                ..PoolOptions::default()
            },
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if let Some(credential) = pool.acquire() {
                            let outcome = if i % 2 == 0 {
                                ReleaseOutcome::Success
                            } else {
                                ReleaseOutcome::Errored
                            };
                            pool.release(&credential, outcome);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.status().total_keys, 3);
    }
}
