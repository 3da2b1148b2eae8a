//! Typed Cache Store
//!
//! Insertion-ordered store backing one typed cache. Tag bookkeeping goes to
//! an index shared by all typed caches, passed in by the owner.

use indexmap::IndexMap;
use tracing::debug;

use crate::cache::{SetOptions, TagIndex};
use crate::typed::{TypedCacheKind, TypedKey, TypedStats};

/// Share of entries dropped when a typed cache overflows.
const EVICTION_DIVISOR: usize = 5;

#[derive(Debug, Clone)]
struct TypedEntry<V> {
    value: V,
    expires_at: Option<u64>,
    tags: Vec<String>,
}

impl<V> TypedEntry<V> {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

// == Typed Cache ==
/// Fixed-purpose cache with an entry ceiling and hit/miss counters.
///
/// Overflow drops the oldest fifth of the entries by insertion order, not LRU.
#[derive(Debug)]
pub(super) struct TypedCache<V> {
    kind: TypedCacheKind,
    entries: IndexMap<String, TypedEntry<V>>,
    max_entries: usize,
    default_ttl_ms: Option<u64>,
    hits: u64,
    misses: u64,
}

impl<V: Clone> TypedCache<V> {
    pub fn new(kind: TypedCacheKind, max_entries: usize, default_ttl_ms: Option<u64>) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
            max_entries,
            default_ttl_ms,
            hits: 0,
            misses: 0,
        }
    }

    // == Insert ==
    /// Stores a value, moving an existing key to the newest insertion slot.
    /// Returns the number of entries evicted to respect the ceiling.
    pub fn insert(
        &mut self,
        index: &mut TagIndex<TypedKey>,
        key: String,
        value: V,
        options: SetOptions,
        now: u64,
    ) -> usize {
        self.remove(index, &key);

        let expires_at = options
            .effective_ttl(self.default_ttl_ms)
            .map(|ttl| now.saturating_add(ttl));
        index.insert(&(self.kind, key.clone()), &options.tags);
        self.entries.insert(
            key,
            TypedEntry {
                value,
                expires_at,
                tags: options.tags,
            },
        );

        if self.entries.len() > self.max_entries {
            self.evict_oldest(index)
        } else {
            0
        }
    }

    // == Get ==
    /// Returns a live value and records a hit; absent or expired keys record a miss.
    pub fn get(&mut self, index: &mut TagIndex<TypedKey>, key: &str, now: u64) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.remove(index, key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Drops the oldest fifth (at least one) of the entries.
    fn evict_oldest(&mut self, index: &mut TagIndex<TypedKey>) -> usize {
        let count = self.entries.len().div_ceil(EVICTION_DIVISOR).max(1);
        for (key, entry) in self.entries.drain(..count) {
            index.remove(&(self.kind, key), &entry.tags);
        }
        debug!(
            cache = self.kind.as_str(),
            evicted = count,
            remaining = self.entries.len(),
            "typed cache over capacity, evicted oldest entries"
        );
        count
    }
}

// == Typed Slot ==
/// Value-independent operations, so the owner can dispatch on kind alone.
pub(super) trait TypedSlot {
    fn remove(&mut self, index: &mut TagIndex<TypedKey>, key: &str) -> bool;
    fn clear(&mut self, index: &mut TagIndex<TypedKey>) -> usize;
    fn invalidate_matching(&mut self, index: &mut TagIndex<TypedKey>, pattern: &str) -> usize;
    fn clean_expired(&mut self, index: &mut TagIndex<TypedKey>, now: u64) -> usize;
    fn stats(&self) -> TypedStats;
    fn reset_stats(&mut self);
    fn len(&self) -> usize;
}

impl<V> TypedCache<V> {
    fn remove_where<F>(&mut self, index: &mut TagIndex<TypedKey>, mut predicate: F) -> usize
    where
        F: FnMut(&str, &TypedEntry<V>) -> bool,
    {
        let before = self.entries.len();
        let kind = self.kind;
        self.entries.retain(|key, entry| {
            if predicate(key, entry) {
                index.remove(&(kind, key.clone()), &entry.tags);
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }
}

impl<V> TypedSlot for TypedCache<V> {
    fn remove(&mut self, index: &mut TagIndex<TypedKey>, key: &str) -> bool {
        match self.entries.shift_remove_entry(key) {
            Some((key, entry)) => {
                index.remove(&(self.kind, key), &entry.tags);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self, index: &mut TagIndex<TypedKey>) -> usize {
        self.remove_where(index, |_, _| true)
    }

    fn invalidate_matching(&mut self, index: &mut TagIndex<TypedKey>, pattern: &str) -> usize {
        self.remove_where(index, |key, _| key.contains(pattern))
    }

    fn clean_expired(&mut self, index: &mut TagIndex<TypedKey>, now: u64) -> usize {
        self.remove_where(index, |_, entry| entry.is_expired(now))
    }

    fn stats(&self) -> TypedStats {
        TypedStats::new(self.hits, self.misses, self.entries.len())
    }

    fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max_entries: usize) -> TypedCache<bool> {
        TypedCache::new(TypedCacheKind::CsrfRequirement, max_entries, Some(1_000))
    }

    fn tagged(tags: &[&str]) -> SetOptions {
        SetOptions::default().tags(tags.iter().copied())
    }

    #[test]
    fn test_insert_and_get_counts_hits_and_misses() {
        let mut index = TagIndex::new();
        let mut cache = cache(10);

        cache.insert(&mut index, "POST:/users".into(), true, tagged(&[]), 0);

        assert_eq!(cache.get(&mut index, "POST:/users", 10), Some(true));
        assert_eq!(cache.get(&mut index, "GET:/users", 10), None);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let mut index = TagIndex::new();
        let mut cache = cache(10);
        cache.insert(&mut index, "k".into(), true, tagged(&["t"]), 0);

        assert_eq!(cache.get(&mut index, "k", 1_000), None);
        assert_eq!(cache.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest_fifth_by_insertion() {
        let mut index = TagIndex::new();
        let mut cache = cache(10);
        for i in 0..10 {
            cache.insert(&mut index, format!("k{}", i), true, tagged(&["t"]), 0);
        }
        // Reading does not change insertion order
        cache.get(&mut index, "k0", 1);

        let evicted = cache.insert(&mut index, "k10".into(), true, tagged(&["t"]), 0);

        // 11 entries, ceil(11 / 5) = 3 oldest dropped
        assert_eq!(evicted, 3);
        assert_eq!(cache.len(), 8);
        for gone in ["k0", "k1", "k2"] {
            assert!(!index.contains("t", &(TypedCacheKind::CsrfRequirement, gone.to_string())));
        }
        assert_eq!(cache.get(&mut index, "k10", 1), Some(true));
    }

    #[test]
    fn test_overwrite_moves_key_to_newest() {
        let mut index = TagIndex::new();
        let mut cache = cache(2);
        cache.insert(&mut index, "a".into(), true, tagged(&[]), 0);
        cache.insert(&mut index, "b".into(), true, tagged(&[]), 0);
        cache.insert(&mut index, "a".into(), false, tagged(&[]), 0);

        cache.insert(&mut index, "c".into(), true, tagged(&[]), 0);

        assert_eq!(cache.get(&mut index, "b", 1), None);
        assert_eq!(cache.get(&mut index, "a", 1), Some(false));
    }

    #[test]
    fn test_invalidate_matching_and_clean_expired() {
        let mut index = TagIndex::new();
        let mut cache = cache(10);
        cache.insert(&mut index, "GET:/api/users".into(), true, tagged(&["u"]), 0);
        cache.insert(&mut index, "GET:/api/roles".into(), true, tagged(&[]), 0);
        cache.insert(
            &mut index,
            "GET:/health".into(),
            true,
            SetOptions::default().ttl_ms(10),
            0,
        );

        assert_eq!(cache.invalidate_matching(&mut index, "/users"), 1);
        assert!(index.is_empty());
        assert_eq!(cache.clean_expired(&mut index, 10), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reset_stats() {
        let mut index = TagIndex::new();
        let mut cache = cache(10);
        cache.get(&mut index, "missing", 0);
        cache.reset_stats();

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 0));
    }
}
