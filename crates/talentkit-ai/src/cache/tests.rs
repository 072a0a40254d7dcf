//! Tests for the response cache

use super::types::{fingerprint, CacheStatistics};
use super::ResponseCache;
use crate::llm::messages::{ChatMessage, CompletionResult, ProviderReply, ResponseSource};
use crate::tier::{FeatureKind, Tier};
use std::time::Duration;

fn live_result(content: &str) -> CompletionResult {
    CompletionResult::live(
        "groq",
        ProviderReply {
            content: content.to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            finish_reason: Some("stop".to_string()),
        },
    )
}

#[tokio::test]
async fn fresh_entry_is_a_hit() {
    let cache = ResponseCache::with_limits(Duration::from_secs(60), 10, 12);
    cache.put("fp-1", live_result("hello")).await;

    let hit = cache.get("fp-1").await.expect("should hit");
    assert_eq!(hit.content, "hello");
    assert_eq!(hit.source, ResponseSource::Live);

    let stats = cache.statistics().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn expired_entry_is_a_miss_even_if_present() {
    let cache = ResponseCache::with_limits(Duration::from_millis(30), 10, 12);
    cache.put("fp-1", live_result("stale")).await;

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(cache.get("fp-1").await.is_none());
    let stats = cache.statistics().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entry_count, 0);
}

#[tokio::test]
async fn put_overwrites_single_entry_per_fingerprint() {
    let cache = ResponseCache::with_limits(Duration::from_secs(60), 10, 12);
    cache.put("fp-1", live_result("first")).await;
    cache.put("fp-1", live_result("second")).await;

    let stats = cache.statistics().await;
    assert_eq!(stats.entry_count, 1);
    assert_eq!(cache.get("fp-1").await.unwrap().content, "second");
}

#[tokio::test]
async fn eviction_removes_expired_then_oldest_inserted() {
    // High water 4, hard cap 3. Entry "a" expires quickly.
    let cache = ResponseCache::with_limits(Duration::from_secs(60), 3, 4);
    cache.put("a", live_result("a")).await;
    cache.put("b", live_result("b")).await;
    cache.put("c", live_result("c")).await;
    cache.put("d", live_result("d")).await;
    // At high water, not over it; fifth insert triggers the pass.
    cache.put("e", live_result("e")).await;

    let stats = cache.statistics().await;
    assert_eq!(stats.entry_count, 3);
    // Oldest-inserted entries went first
    assert!(cache.get("a").await.is_none());
    assert!(cache.get("b").await.is_none());
    assert!(cache.get("c").await.is_some());
    assert!(cache.get("e").await.is_some());
}

#[tokio::test]
async fn forced_evict_drops_only_expired_when_under_cap() {
    let cache = ResponseCache::with_limits(Duration::from_millis(30), 10, 12);
    cache.put("old", live_result("old")).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    cache.put("new", live_result("new")).await;

    cache.evict().await;

    let stats = cache.statistics().await;
    assert_eq!(stats.entry_count, 1);
    assert!(cache.get("new").await.is_some());
}

#[tokio::test]
async fn statistics_report_the_hit_rate() {
    let cache = ResponseCache::with_limits(Duration::from_secs(60), 10, 12);
    cache.put("fp-1", live_result("hello")).await;

    assert!(cache.get("fp-1").await.is_some());
    assert!(cache.get("missing").await.is_none());

    let stats = cache.statistics().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

    // No lookups yet means a zero rate, not a division by zero
    assert_eq!(CacheStatistics::default().hit_rate(), 0.0);
}

#[test]
fn fingerprint_covers_full_content() {
    // Two long inputs sharing a 4KB prefix must not collide.
    let prefix = "x".repeat(4096);
    let a = vec![ChatMessage::user(format!("{prefix}ending-one"))];
    let b = vec![ChatMessage::user(format!("{prefix}ending-two"))];

    let fp_a = fingerprint(&a, Tier::Basic, FeatureKind::ResumeAnalysis);
    let fp_b = fingerprint(&b, Tier::Basic, FeatureKind::ResumeAnalysis);
    assert_ne!(fp_a, fp_b);
}

#[test]
fn fingerprint_varies_with_tier_and_feature() {
    let messages = vec![ChatMessage::user("ping")];
    let basic = fingerprint(&messages, Tier::Basic, FeatureKind::JobMatch);
    let premium = fingerprint(&messages, Tier::Premium, FeatureKind::JobMatch);
    let other_feature = fingerprint(&messages, Tier::Basic, FeatureKind::CoverLetter);
    assert_ne!(basic, premium);
    assert_ne!(basic, other_feature);
}

#[test]
fn fingerprint_normalizes_surrounding_whitespace() {
    let a = vec![ChatMessage::user("  ping  ")];
    let b = vec![ChatMessage::user("ping")];
    assert_eq!(
        fingerprint(&a, Tier::Basic, FeatureKind::JobMatch),
        fingerprint(&b, Tier::Basic, FeatureKind::JobMatch)
    );
}
