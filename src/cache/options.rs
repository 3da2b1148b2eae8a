//! Cache Options Module
//!
//! Construction-time configuration for cache instances and registry caches,
//! plus per-call write options.

use serde::Deserialize;

use crate::config::Config;
use crate::error::{CacheError, Result};

// == Instance Config ==
/// Budgets and policy parameters of a single cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Maximum number of entries (> 0)
    pub max_entries: usize,
    /// Maximum total estimated size in bytes (> 0)
    pub max_bytes: usize,
    /// Default TTL in milliseconds, 0 = entries never expire
    pub default_ttl_ms: u64,
    /// Accesses at which an entry becomes hot (>= 1)
    pub frequency_threshold: u64,
}

impl InstanceConfig {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            max_entries,
            max_bytes,
            ..Self::default()
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    pub fn with_frequency_threshold(mut self, threshold: u64) -> Self {
        self.frequency_threshold = threshold;
        self
    }

    // == Validate ==
    /// Rejects non-positive budgets and a zero frequency threshold.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if self.max_bytes == 0 {
            return Err(CacheError::Config(
                "max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.frequency_threshold == 0 {
            return Err(CacheError::Config(
                "frequency_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default TTL as used for new entries (`None` when entries never expire).
    pub fn default_ttl(&self) -> Option<u64> {
        (self.default_ttl_ms > 0).then_some(self.default_ttl_ms)
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        let config = Config::default();
        Self::from(&config)
    }
}

impl From<&Config> for InstanceConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            default_ttl_ms: config.default_ttl_ms,
            frequency_threshold: config.frequency_threshold,
        }
    }
}

// == Named Cache Config ==
/// Registry request for a named cache. Unset fields fall back to the
/// registry defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedCacheConfig {
    pub name: String,
    #[serde(default)]
    pub max_entries: Option<usize>,
    #[serde(default)]
    pub max_bytes: Option<usize>,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Registry-level tags: attached to every entry written through the
    /// registry and indexed for cross-cache invalidation
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NamedCacheConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Resolves the instance configuration against registry defaults.
    pub fn resolve(&self, defaults: &InstanceConfig) -> InstanceConfig {
        InstanceConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_bytes: self.max_bytes.unwrap_or(defaults.max_bytes),
            default_ttl_ms: self.ttl_ms.unwrap_or(defaults.default_ttl_ms),
            frequency_threshold: defaults.frequency_threshold,
        }
    }
}

// == Set Options ==
/// Per-call options for a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetOptions {
    /// TTL override in milliseconds; `Some(0)` stores without expiry
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetOptions {
    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Effective TTL given a fallback default (`None` = never expires).
    pub fn effective_ttl(&self, default: Option<u64>) -> Option<u64> {
        match self.ttl_ms {
            Some(0) => None,
            Some(ttl) => Some(ttl),
            None => default,
        }
    }
}
