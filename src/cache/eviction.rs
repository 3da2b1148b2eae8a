//! Eviction Policy Module
//!
//! Hybrid LRU + access-frequency eviction order.
//!
//! Candidates are split into a cold set (`access_count < frequency_threshold`)
//! and a hot set. Cold entries are evicted first in least-recently-used order;
//! hot entries are only touched once every cold candidate is gone, again in
//! LRU order. Frequently reused entries therefore survive LRU churn, while the
//! owning cache can always make room.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Hybrid Policy ==
/// Hybrid LRU/frequency eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridPolicy {
    /// Accesses at which an entry becomes hot
    frequency_threshold: u64,
}

impl HybridPolicy {
    // == Constructor ==
    /// Creates a policy with the given hot threshold (must be at least 1).
    pub fn new(frequency_threshold: u64) -> Self {
        Self {
            frequency_threshold: frequency_threshold.max(1),
        }
    }

    pub fn frequency_threshold(&self) -> u64 {
        self.frequency_threshold
    }

    // == Is Hot ==
    /// Returns true if the entry has reached the frequency threshold.
    pub fn is_hot<V>(&self, entry: &CacheEntry<V>) -> bool {
        entry.access_count >= self.frequency_threshold
    }

    // == Eviction Order ==
    /// Returns every key except `protected` in the order it should be evicted:
    /// cold keys oldest-first, followed by hot keys oldest-first.
    pub fn eviction_order<V>(
        &self,
        entries: &HashMap<String, CacheEntry<V>>,
        protected: Option<&str>,
    ) -> Vec<String> {
        let mut cold: Vec<(&String, &CacheEntry<V>)> = Vec::new();
        let mut hot: Vec<(&String, &CacheEntry<V>)> = Vec::new();

        for (key, entry) in entries {
            if protected == Some(key.as_str()) {
                continue;
            }
            if self.is_hot(entry) {
                hot.push((key, entry));
            } else {
                cold.push((key, entry));
            }
        }

        cold.sort_by_key(|(_, entry)| entry.recency());
        hot.sort_by_key(|(_, entry)| entry.recency());

        cold.into_iter()
            .chain(hot)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for HybridPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
