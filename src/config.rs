//! Configuration Module
//!
//! Handles loading process-wide cache defaults and server settings from
//! environment variables.

use std::env;
use std::str::FromStr;

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default entry ceiling for registry caches
    pub max_entries: usize,
    /// Default byte budget for registry caches
    pub max_bytes: usize,
    /// Default TTL in milliseconds (0 = entries never expire)
    pub default_ttl_ms: u64,
    /// Accesses after which an entry counts as hot
    pub frequency_threshold: u64,
    /// Cache monitor interval in seconds
    pub monitor_interval: u64,
    /// Entry ceiling of each typed cache
    pub typed_max_entries: usize,
    /// Default TTL of typed cache entries in milliseconds
    pub typed_ttl_ms: u64,
    /// Typed cache sweep interval in seconds
    pub typed_sweep_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Default max entries per cache (default: 1000)
    /// - `CACHE_MAX_BYTES` - Default byte budget per cache (default: 5 MiB)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms (default: 300000)
    /// - `CACHE_FREQUENCY_THRESHOLD` - Hot entry threshold (default: 3)
    /// - `MONITOR_INTERVAL_SECS` - Monitor tick in seconds (default: 60)
    /// - `TYPED_CACHE_MAX_ENTRIES` - Typed cache ceiling (default: 500)
    /// - `TYPED_CACHE_TTL_MS` - Typed cache TTL in ms (default: 300000)
    /// - `TYPED_SWEEP_INTERVAL_SECS` - Typed sweep tick in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            max_bytes: env_or("CACHE_MAX_BYTES", defaults.max_bytes),
            default_ttl_ms: env_or("CACHE_DEFAULT_TTL_MS", defaults.default_ttl_ms),
            frequency_threshold: env_or(
                "CACHE_FREQUENCY_THRESHOLD",
                defaults.frequency_threshold,
            ),
            monitor_interval: env_or("MONITOR_INTERVAL_SECS", defaults.monitor_interval),
            typed_max_entries: env_or("TYPED_CACHE_MAX_ENTRIES", defaults.typed_max_entries),
            typed_ttl_ms: env_or("TYPED_CACHE_TTL_MS", defaults.typed_ttl_ms),
            typed_sweep_interval: env_or(
                "TYPED_SWEEP_INTERVAL_SECS",
                defaults.typed_sweep_interval,
            ),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }
}

/// Parses an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_bytes: 5 * 1024 * 1024,
            default_ttl_ms: 300_000,
            frequency_threshold: 3,
            monitor_interval: 60,
            typed_max_entries: 500,
            typed_ttl_ms: 300_000,
            typed_sweep_interval: 60,
            server_port: 3000,
        }
    }
}
