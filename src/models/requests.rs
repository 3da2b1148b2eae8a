//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::SetOptions;

/// Longest key accepted over HTTP.
pub const MAX_KEY_LENGTH: usize = 256;

/// Hot paths returned when `limit` is absent.
pub const DEFAULT_HOT_PATHS: usize = 10;

/// Request body for `PUT /caches/:name/entries/:key`
#[derive(Debug, Clone, Deserialize)]
pub struct SetEntryRequest {
    /// The value to store
    pub value: Value,
    /// Tags attached to the entry, on top of the cache's own tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional TTL in milliseconds; 0 stores without expiry
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetEntryRequest {
    /// Validates the request against the key it is stored under.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }

    pub fn into_parts(self) -> (Value, SetOptions) {
        let options = SetOptions {
            ttl_ms: self.ttl_ms,
            tags: self.tags,
        };
        (self.value, options)
    }
}

/// Request body for `POST /caches/:name/invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePrefixRequest {
    pub prefix: String,
}

/// Request body for `POST /maintenance/clear`
///
/// Without a pattern every cache is cleared, typed caches included.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Query string of `GET /caches/:name/hot`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotPathsQuery {
    pub limit: Option<usize>,
}

impl HotPathsQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HOT_PATHS)
    }
}

/// Query string of `GET /typed/:kind/stats`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypedStatsQuery {
    /// Zero the hit/miss counters after reading them
    #[serde(default)]
    pub reset: bool,
}
