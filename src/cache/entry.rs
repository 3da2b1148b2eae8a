//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, access
//! tracking and tags.

use std::collections::BTreeSet;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// All timestamps are Unix milliseconds as reported by the owning cache's clock.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Estimated size of the value, used for byte budget accounting
    pub size_bytes: usize,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Timestamp of the last successful read (or insertion)
    pub last_accessed_at: u64,
    /// Logical access sequence, orders accesses within the same millisecond
    pub access_seq: u64,
    /// Insertion timestamp
    pub inserted_at: u64,
    /// Expiration timestamp, None = no expiration
    pub expires_at: Option<u64>,
    /// Labels used for bulk invalidation
    pub tags: BTreeSet<String>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry inserted at `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `size_bytes` - Estimated size of `value`
    /// * `now` - Insertion timestamp
    /// * `seq` - Logical access sequence at insertion
    /// * `ttl_ms` - Optional TTL in milliseconds
    /// * `tags` - Tags attached to the entry
    pub fn new(
        value: V,
        size_bytes: usize,
        now: u64,
        seq: u64,
        ttl_ms: Option<u64>,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            value,
            size_bytes,
            access_count: 0,
            last_accessed_at: now,
            access_seq: seq,
            inserted_at: now,
            expires_at: ttl_ms.map(|ttl| now.saturating_add(ttl)),
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`, so a TTL that has fully
    /// elapsed expires the entry immediately.
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64, seq: u64) {
        self.access_count += 1;
        self.last_accessed_at = now;
        self.access_seq = seq;
    }

    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }

    /// Key used for LRU ordering: oldest access sorts first.
    pub(crate) fn recency(&self) -> (u64, u64) {
        (self.last_accessed_at, self.access_seq)
    }
}
