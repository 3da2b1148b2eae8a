//! Tagcache - A bounded in-memory cache engine
//!
//! Named caches with entry and byte budgets, hybrid LRU/frequency eviction,
//! per-entry TTL and tag/prefix invalidation, plus a periodic monitor, fixed
//! typed caches for request-path data and an admin HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod tasks;
pub mod typed;

pub use api::{create_router, AppState};
pub use cache::{CacheInstance, CacheRegistry, InstanceConfig, NamedCacheConfig, SetOptions};
pub use config::Config;
pub use error::{CacheError, Result};
pub use monitor::{CacheMonitor, MonitoredCache};
pub use typed::{TypedCacheKind, TypedCaches};
