//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, HotPath, InstanceConfig};
use crate::typed::{TypedCacheKind, TypedStats};

/// Response body for `GET /caches/:name/entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub cache: String,
    pub key: String,
    pub value: Value,
}

impl EntryResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            cache: cache.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /caches/:name/entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct SetEntryResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    pub key: String,
}

impl SetEntryResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>) -> Self {
        let cache = cache.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' set in cache '{}'", key, cache),
            cache,
            key,
        }
    }
}

/// Response body for `DELETE /caches/:name/entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>) -> Self {
        let cache = cache.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted from cache '{}'", key, cache),
            cache,
            key,
        }
    }
}

/// Response body for `POST /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CacheCreatedResponse {
    pub name: String,
    /// False when the name already existed and its configuration was kept
    pub created: bool,
    pub max_entries: usize,
    pub max_bytes: usize,
    pub default_ttl_ms: u64,
    pub frequency_threshold: u64,
}

impl CacheCreatedResponse {
    pub fn new(name: impl Into<String>, created: bool, config: &InstanceConfig) -> Self {
        Self {
            name: name.into(),
            created,
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            default_ttl_ms: config.default_ttl_ms,
            frequency_threshold: config.frequency_threshold,
        }
    }
}

/// Response body for `GET /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    pub caches: BTreeMap<String, CacheStats>,
}

/// Response body for `GET /caches/:name/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub name: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStatsResponse {
    pub fn new(name: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            name: name.into(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for `GET /caches/:name/hot`
#[derive(Debug, Clone, Serialize)]
pub struct HotPathsResponse {
    pub name: String,
    pub hot_paths: Vec<HotPath>,
}

/// Entry count removed by an invalidation, clear or sweep.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

impl RemovedResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for `POST /tags/:tag/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct TagInvalidationResponse {
    pub tag: String,
    /// Entries removed from registry caches
    pub removed: usize,
    /// Entries removed from the typed caches
    pub typed_removed: usize,
}

/// Response body for `POST /maintenance/clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Caches cleared by pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_caches: Option<usize>,
    /// Entries removed by a full clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl ClearResponse {
    pub fn by_pattern(pattern: impl Into<String>, cleared_caches: usize) -> Self {
        Self {
            pattern: Some(pattern.into()),
            cleared_caches: Some(cleared_caches),
            removed: None,
        }
    }

    pub fn all(removed: usize) -> Self {
        Self {
            pattern: None,
            cleared_caches: None,
            removed: Some(removed),
        }
    }
}

/// Response body for `GET /typed/:kind/stats`
#[derive(Debug, Clone, Serialize)]
pub struct TypedStatsResponse {
    pub kind: TypedCacheKind,
    #[serde(flatten)]
    pub stats: TypedStats,
    /// Whether the counters were zeroed after this read
    pub reset: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of registered caches
    pub caches: usize,
    /// Whether the monitor timer is running
    pub monitoring: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(caches: usize, monitoring: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            caches,
            monitoring,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
