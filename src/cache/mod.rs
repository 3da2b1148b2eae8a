//! Cache Module
//!
//! Bounded in-memory caching with TTL expiration, hybrid LRU/frequency
//! eviction, byte budgets and tag/prefix invalidation.

mod clock;
mod entry;
mod eviction;
mod instance;
mod options;
mod registry;
mod size;
mod stats;
mod tags;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use eviction::HybridPolicy;
pub use instance::CacheInstance;
pub use options::{InstanceConfig, NamedCacheConfig, SetOptions};
pub use registry::{CacheRegistry, SharedCache};
pub use size::{
    estimate_or_default, FixedSizeEstimator, JsonSizeEstimator, SizeEstimator,
    DEFAULT_SIZE_ESTIMATE,
};
pub use stats::{CacheStats, HotPath};
pub use tags::TagIndex;
