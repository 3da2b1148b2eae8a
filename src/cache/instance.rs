//! Cache Instance Module
//!
//! Main cache engine combining the entry store, the hybrid eviction policy and
//! the tag index behind a single lock.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::cache::size::estimate_or_default;
use crate::cache::stats::Counters;
use crate::cache::{
    CacheEntry, CacheStats, Clock, HotPath, HybridPolicy, InstanceConfig, JsonSizeEstimator,
    SetOptions, SizeEstimator, SystemClock, TagIndex,
};
use crate::error::{CacheError, Result};

// == Cache Instance ==
/// Bounded cache with TTL expiry, hybrid LRU/frequency eviction and tag- and
/// prefix-based invalidation.
///
/// Entries, tag index and byte total are guarded by one mutex, so readers never
/// observe them out of step. Every operation runs to completion under the lock
/// and never blocks on anything else.
pub struct CacheInstance<V> {
    config: InstanceConfig,
    policy: HybridPolicy,
    clock: Arc<dyn Clock>,
    estimator: Arc<dyn SizeEstimator<V>>,
    state: Mutex<InstanceState<V>>,
}

/// Mutable state guarded by the instance lock.
struct InstanceState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    tags: TagIndex,
    /// Always equals the sum of `size_bytes` over `entries`
    total_bytes: usize,
    /// Logical clock for access ordering
    seq: u64,
    counters: Counters,
}

impl<V: Serialize + 'static> CacheInstance<V> {
    // == Constructor ==
    /// Creates a cache sized by the JSON encoding of its values, on the system clock.
    pub fn new(config: InstanceConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(JsonSizeEstimator::new()),
            Arc::new(SystemClock),
        )
    }
}

impl<V> CacheInstance<V> {
    /// Creates a cache with an explicit size estimator and clock.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`] for non-positive budgets or a zero
    /// frequency threshold.
    pub fn with_parts(
        config: InstanceConfig,
        estimator: Arc<dyn SizeEstimator<V>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: HybridPolicy::new(config.frequency_threshold),
            config,
            clock,
            estimator,
            state: Mutex::new(InstanceState {
                entries: HashMap::new(),
                tags: TagIndex::new(),
                total_bytes: 0,
                seq: 0,
                counters: Counters::default(),
            }),
        })
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    // == Set ==
    /// Stores `value` under `key` with the default TTL and the given tags.
    ///
    /// Overwrites replace the old entry, its size and its tag associations.
    /// On return the entry and byte budgets hold, except that a single value
    /// larger than `max_bytes` is kept as the only entry.
    pub fn set<I, S>(&self, key: impl Into<String>, value: V, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_with(key, value, SetOptions::default().tags(tags));
    }

    /// Stores `value` under `key` with per-call TTL and tags.
    pub fn set_with(&self, key: impl Into<String>, value: V, options: SetOptions) {
        let key = key.into();
        let size_bytes = estimate_or_default(self.estimator.as_ref(), &key, &value);
        let ttl_ms = options.effective_ttl(self.config.default_ttl());
        let tags: BTreeSet<String> = options.tags.into_iter().collect();
        let now = self.clock.now_ms();

        let mut state = self.state.lock();
        state.remove_entry(&key);

        let seq = state.next_seq();
        state.tags.insert(&key, &tags);
        state.total_bytes += size_bytes;
        state.entries.insert(
            key.clone(),
            CacheEntry::new(value, size_bytes, now, seq, ttl_ms, tags),
        );

        let evicted = state.enforce_budget(&self.config, &self.policy, &key);
        if evicted > 0 {
            debug!(
                key = %key,
                evicted,
                entries = state.entries.len(),
                bytes = state.total_bytes,
                "evicted entries to admit new key"
            );
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on access and reported as misses. A hit
    /// bumps the entry's access count and recency.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                state.counters.record_miss();
                return None;
            }
        };

        if expired {
            state.remove_entry(key);
            state.counters.record_miss();
            debug!(key = key, "lazily expired entry on read");
            return None;
        }

        let seq = state.next_seq();
        state.counters.record_hit();
        state.entries.get_mut(key).map(|entry| {
            entry.touch(now, seq);
            entry.value.clone()
        })
    }

    /// Returns true if a live entry exists for `key`. Does not count as an access.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    // == Remove ==
    /// Removes a single entry. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove_entry(key).is_some()
    }

    // == Clean Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub fn clean_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.remove_where(|_, entry| entry.is_expired(now))
    }

    // == Invalidate By Tag ==
    /// Removes every entry labelled with `tag`. Unknown tags are a no-op.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock();
        let keys = state.tags.take(tag);
        let removed = keys
            .iter()
            .filter(|key| state.remove_entry(key).is_some())
            .count();
        if removed > 0 {
            debug!(tag = tag, removed, "invalidated entries by tag");
        }
        removed
    }

    // == Invalidate By Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let removed = self
            .state
            .lock()
            .remove_where(|key, _| key.starts_with(prefix));
        if removed > 0 {
            debug!(prefix = prefix, removed, "invalidated entries by prefix");
        }
        removed
    }

    // == Clear ==
    /// Removes all entries. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.tags.clear();
        state.total_bytes = 0;
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let entries = state.entries.len();
        let avg_access_count = if entries == 0 {
            0.0
        } else {
            let total: u64 = state.entries.values().map(|e| e.access_count).sum();
            total as f64 / entries as f64
        };

        CacheStats {
            entries,
            bytes: state.total_bytes,
            max_entries: self.config.max_entries,
            max_bytes: self.config.max_bytes,
            avg_access_count,
            hits: state.counters.hits,
            misses: state.counters.misses,
            evictions: state.counters.evictions,
        }
    }

    // == Hot Paths ==
    /// Returns the `n` most accessed keys, highest count first. Equal counts
    /// put the most recently accessed key first.
    pub fn hot_paths(&self, n: usize) -> Vec<HotPath> {
        let state = self.state.lock();
        let mut ranked: Vec<(&String, &CacheEntry<V>)> = state.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| b.recency().cmp(&a.recency()))
        });

        ranked
            .into_iter()
            .take(n)
            .map(|(key, entry)| HotPath {
                key: key.clone(),
                access_count: entry.access_count,
            })
            .collect()
    }

    // == Length ==
    /// Returns the current number of entries, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Returns the running total of estimated entry sizes.
    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }

    /// Returns the current keys in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    // == Check Invariants ==
    /// Verifies that the entry store, tag index and byte total agree.
    pub fn check_invariants(&self) -> Result<()> {
        let state = self.state.lock();

        let summed: usize = state.entries.values().map(|e| e.size_bytes).sum();
        if summed != state.total_bytes {
            return Err(CacheError::Invariant(format!(
                "total_bytes {} != sum of entry sizes {}",
                state.total_bytes, summed
            )));
        }

        for (tag, key) in state.tags.pairs() {
            let tagged = state
                .entries
                .get(key)
                .is_some_and(|entry| entry.tags.contains(tag));
            if !tagged {
                return Err(CacheError::Invariant(format!(
                    "tag index maps '{}' to '{}' but the entry does not carry it",
                    tag, key
                )));
            }
        }

        for (key, entry) in &state.entries {
            if let Some(tag) = entry.tags.iter().find(|tag| !state.tags.contains(tag, key)) {
                return Err(CacheError::Invariant(format!(
                    "entry '{}' carries tag '{}' missing from the tag index",
                    key, tag
                )));
            }
        }

        Ok(())
    }
}

impl<V> InstanceState<V> {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Removes an entry together with its size and tag associations.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let (key, entry) = self.entries.remove_entry(key)?;
        self.total_bytes -= entry.size_bytes;
        self.tags.remove(&key, &entry.tags);
        Some(entry)
    }

    fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry<V>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }
        doomed.len()
    }

    fn over_budget(&self, config: &InstanceConfig) -> bool {
        self.entries.len() > config.max_entries || self.total_bytes > config.max_bytes
    }

    // == Enforce Budget ==
    /// Evicts in policy order until both budgets hold or only `protected`
    /// remains. Returns the number of evicted entries.
    fn enforce_budget(
        &mut self,
        config: &InstanceConfig,
        policy: &HybridPolicy,
        protected: &str,
    ) -> usize {
        if !self.over_budget(config) {
            return 0;
        }

        let mut evicted = 0;
        for key in policy.eviction_order(&self.entries, Some(protected)) {
            if !self.over_budget(config) {
                break;
            }
            self.remove_entry(&key);
            evicted += 1;
        }

        self.counters.record_evictions(evicted);
        evicted
    }
}

impl<V> fmt::Debug for CacheInstance<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CacheInstance")
            .field("config", &self.config)
            .field("entries", &state.entries.len())
            .field("total_bytes", &state.total_bytes)
            .finish()
    }
}
