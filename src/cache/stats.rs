//! Cache Statistics Module
//!
//! Snapshot types describing budget usage, access counters and hot paths.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time statistics for one cache instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub entries: usize,
    /// Sum of the estimated sizes of current entries
    pub bytes: usize,
    /// Entry ceiling
    pub max_entries: usize,
    /// Byte budget
    pub max_bytes: usize,
    /// Mean access count over current entries (0 if empty)
    pub avg_access_count: f64,
    /// Number of successful reads
    pub hits: u64,
    /// Number of failed reads (key absent or expired)
    pub misses: u64,
    /// Number of entries removed by the eviction policy
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of the entry ceiling in use.
    pub fn usage_ratio(&self) -> f64 {
        ratio(self.entries, self.max_entries)
    }

    /// Fraction of the byte budget in use.
    pub fn memory_ratio(&self) -> f64 {
        ratio(self.bytes, self.max_bytes)
    }
}

fn ratio(used: usize, max: usize) -> f64 {
    if max == 0 {
        0.0
    } else {
        used as f64 / max as f64
    }
}

// == Counters ==
/// Running read/eviction counters kept by a cache instance.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }
}

// == Hot Path ==
/// A frequently accessed key and its access count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotPath {
    pub key: String,
    pub access_count: u64,
}
