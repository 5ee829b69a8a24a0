//! Classification cache backed by moka.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;

use doc_agent_core::{config::CacheConfig, traits::ClassificationCache, types::ClassificationResult};

/// Bounded LRU cache whose entries expire after a fixed time-to-live.
#[derive(Clone)]
pub struct MokaClassificationCache {
    inner: Cache<String, ClassificationResult>,
}

impl MokaClassificationCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { inner }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    /// Approximate entry count; call `run_pending_tasks` first for an exact figure.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[async_trait]
impl ClassificationCache for MokaClassificationCache {
    async fn get(&self, key: &str) -> Option<ClassificationResult> {
        self.inner.get(key).await
    }

    async fn insert(&self, key: String, result: ClassificationResult) {
        self.inner.insert(key, result).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_agent_core::types::{ClassificationTier, Intent};

    fn result(intent: Intent) -> ClassificationResult {
        ClassificationResult::new(intent, 0.9, ClassificationTier::Rules)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = MokaClassificationCache::new(10, Duration::from_secs(60));
        cache.insert("-|hello".into(), result(Intent::GeneralQa)).await;
        assert_eq!(cache.get("-|hello").await, Some(result(Intent::GeneralQa)));
        assert_eq!(cache.get("-|other").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MokaClassificationCache::new(10, Duration::from_millis(50));
        cache.insert("k".into(), result(Intent::WebSearch)).await;
        // moka reads its own clock, not tokio's
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = MokaClassificationCache::new(2, Duration::from_secs(60));
        for i in 0..10 {
            cache.insert(format!("k{}", i), result(Intent::KnowledgeQa)).await;
        }
        cache.run_pending_tasks().await;
        assert!(cache.entry_count() <= 2);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = MokaClassificationCache::new(10, Duration::from_secs(60));
        cache.insert("k".into(), result(Intent::WebSearch)).await;
        cache.insert("k".into(), result(Intent::UrlSummary)).await;
        assert_eq!(cache.get("k").await.map(|r| r.intent), Some(Intent::UrlSummary));
    }
}
