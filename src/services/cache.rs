use crate::models::CandidateListing;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// In-process cache of live marketplace results
///
/// Entries expire after the configured TTL so layout or stock changes on
/// the marketplace show up quickly. Only successful fetches are stored.
#[derive(Clone)]
pub struct ListingCache {
    entries: moka::future::Cache<String, Arc<Vec<CandidateListing>>>,
    ttl_secs: u64,
}

impl ListingCache {
    /// Create a new cache
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries, ttl_secs }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<CandidateListing>> {
        match self.entries.get(key).await {
            Some(listings) => {
                tracing::trace!("Cache hit: {}", key);
                Some(listings.as_ref().clone())
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                None
            }
        }
    }

    pub async fn insert(&self, key: String, listings: Vec<CandidateListing>) {
        tracing::trace!("Cache set: {}", key);
        self.entries.insert(key, Arc::new(listings)).await;
    }

    pub async fn delete(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.entry_count(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for live results of a search phrase
    pub fn live_results(phrase: &str) -> String {
        format!("live:{}", phrase.trim().to_lowercase())
    }
}
