//! Typed Caches
//!
//! Three fixed-purpose caches for request-path data that is cheap to
//! recompute: computed request headers, CSRF requirement flags and computed
//! security headers. Keys are caller-supplied, typically `METHOD:url`.
//!
//! All three share one tag index keyed by `(kind, key)`, so a tag can
//! invalidate related entries across caches in one call. Capacity is a plain
//! entry ceiling; overflow evicts the oldest fifth by insertion order.

mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{Clock, SetOptions, SystemClock, TagIndex};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::PeriodicTask;

use store::{TypedCache, TypedSlot};

/// Header name -> value.
pub type HeaderMap = BTreeMap<String, String>;

/// Member of the shared tag index.
pub type TypedKey = (TypedCacheKind, String);

// == Typed Cache Kind ==
/// Identifies one of the typed caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedCacheKind {
    RequestHeaders,
    CsrfRequirement,
    SecurityHeaders,
}

impl TypedCacheKind {
    pub const ALL: [TypedCacheKind; 3] = [
        TypedCacheKind::RequestHeaders,
        TypedCacheKind::CsrfRequirement,
        TypedCacheKind::SecurityHeaders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypedCacheKind::RequestHeaders => "headers",
            TypedCacheKind::CsrfRequirement => "csrf",
            TypedCacheKind::SecurityHeaders => "security",
        }
    }
}

impl fmt::Display for TypedCacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypedCacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        TypedCacheKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CacheError::Config(format!("unknown typed cache '{}'", s)))
    }
}

// == Typed Stats ==
/// Hit/miss counters and size of one typed cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypedStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// hits / (hits + misses), 0 when there were no reads
    pub hit_ratio: f64,
}

impl TypedStats {
    pub fn new(hits: u64, misses: u64, size: usize) -> Self {
        let reads = (hits + misses).max(1);
        Self {
            hits,
            misses,
            size,
            hit_ratio: hits as f64 / reads as f64,
        }
    }
}

// == Typed Cache Config ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedCacheConfig {
    /// Entry ceiling of each typed cache (> 0)
    pub max_entries: usize,
    /// Default TTL in milliseconds, 0 = never expires
    pub default_ttl_ms: u64,
}

impl From<&Config> for TypedCacheConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_entries: config.typed_max_entries,
            default_ttl_ms: config.typed_ttl_ms,
        }
    }
}

struct TypedState {
    headers: TypedCache<HeaderMap>,
    csrf: TypedCache<bool>,
    security: TypedCache<HeaderMap>,
    tags: TagIndex<TypedKey>,
}

impl TypedState {
    /// Borrows one cache alongside the shared tag index.
    fn split(&mut self, kind: TypedCacheKind) -> (&mut dyn TypedSlot, &mut TagIndex<TypedKey>) {
        let slot: &mut dyn TypedSlot = match kind {
            TypedCacheKind::RequestHeaders => &mut self.headers,
            TypedCacheKind::CsrfRequirement => &mut self.csrf,
            TypedCacheKind::SecurityHeaders => &mut self.security,
        };
        (slot, &mut self.tags)
    }
}

// == Typed Caches ==
/// The three typed caches behind one lock, with their background sweep.
pub struct TypedCaches {
    clock: Arc<dyn Clock>,
    state: Mutex<TypedState>,
    sweep: PeriodicTask,
}

impl TypedCaches {
    // == Constructor ==
    /// Creates the typed caches on the system clock.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`] if `max_entries` is zero.
    pub fn new(config: TypedCacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TypedCacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.max_entries == 0 {
            return Err(CacheError::Config(
                "typed cache max_entries must be greater than zero".to_string(),
            ));
        }

        let ttl = (config.default_ttl_ms > 0).then_some(config.default_ttl_ms);
        let max = config.max_entries;
        Ok(Self {
            clock,
            state: Mutex::new(TypedState {
                headers: TypedCache::new(TypedCacheKind::RequestHeaders, max, ttl),
                csrf: TypedCache::new(TypedCacheKind::CsrfRequirement, max, ttl),
                security: TypedCache::new(TypedCacheKind::SecurityHeaders, max, ttl),
                tags: TagIndex::new(),
            }),
            sweep: PeriodicTask::new("typed-cache-sweep"),
        })
    }

    // == Request Headers ==
    pub fn set_request_headers(
        &self,
        key: impl Into<String>,
        headers: HeaderMap,
        options: SetOptions,
    ) {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state
            .headers
            .insert(&mut state.tags, key.into(), headers, options, now);
    }

    pub fn get_request_headers(&self, key: &str) -> Option<HeaderMap> {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.headers.get(&mut state.tags, key, now)
    }

    // == CSRF Requirement ==
    pub fn set_csrf_required(&self, key: impl Into<String>, required: bool, options: SetOptions) {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state
            .csrf
            .insert(&mut state.tags, key.into(), required, options, now);
    }

    pub fn get_csrf_required(&self, key: &str) -> Option<bool> {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.csrf.get(&mut state.tags, key, now)
    }

    // == Security Headers ==
    pub fn set_security_headers(
        &self,
        key: impl Into<String>,
        headers: HeaderMap,
        options: SetOptions,
    ) {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state
            .security
            .insert(&mut state.tags, key.into(), headers, options, now);
    }

    pub fn get_security_headers(&self, key: &str) -> Option<HeaderMap> {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.security.get(&mut state.tags, key, now)
    }

    // == Remove / Clear ==
    pub fn remove(&self, kind: TypedCacheKind, key: &str) -> bool {
        let mut state = self.state.lock();
        let (cache, tags) = state.split(kind);
        cache.remove(tags, key)
    }

    pub fn clear(&self, kind: TypedCacheKind) -> usize {
        let mut state = self.state.lock();
        let (cache, tags) = state.split(kind);
        cache.clear(tags)
    }

    pub fn clear_all(&self) -> usize {
        TypedCacheKind::ALL.iter().map(|kind| self.clear(*kind)).sum()
    }

    // == Invalidate By Url Pattern ==
    /// Removes entries of `kind` whose key contains `pattern`.
    pub fn invalidate_by_url_pattern(&self, kind: TypedCacheKind, pattern: &str) -> usize {
        let mut state = self.state.lock();
        let (cache, tags) = state.split(kind);
        let removed = cache.invalidate_matching(tags, pattern);
        debug!(
            cache = kind.as_str(),
            pattern = pattern,
            removed,
            "typed url pattern invalidation"
        );
        removed
    }

    // == Invalidate By Tag ==
    /// Removes every entry tagged `tag`, across all three caches.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock();
        let members = state.tags.take(tag);

        let mut removed = 0;
        for (kind, key) in &members {
            let (cache, tags) = state.split(*kind);
            if cache.remove(tags, key) {
                removed += 1;
            }
        }
        debug!(tag = tag, removed, "typed tag invalidation");
        removed
    }

    // == Stats ==
    pub fn stats(&self, kind: TypedCacheKind) -> TypedStats {
        let mut state = self.state.lock();
        let (cache, _) = state.split(kind);
        cache.stats()
    }

    /// Returns the current stats of `kind`, then zeroes its hit/miss counters.
    pub fn get_and_reset_stats(&self, kind: TypedCacheKind) -> TypedStats {
        let mut state = self.state.lock();
        let (cache, _) = state.split(kind);
        let stats = cache.stats();
        cache.reset_stats();
        stats
    }

    pub fn reset_stats(&self, kind: TypedCacheKind) {
        let mut state = self.state.lock();
        let (cache, _) = state.split(kind);
        cache.reset_stats();
    }

    pub fn len(&self, kind: TypedCacheKind) -> usize {
        let mut state = self.state.lock();
        let (cache, _) = state.split(kind);
        cache.len()
    }

    // == Clean Expired ==
    /// Removes expired entries from all three caches.
    pub fn clean_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        TypedCacheKind::ALL
            .iter()
            .map(|kind| {
                let (cache, tags) = state.split(*kind);
                cache.clean_expired(tags, now)
            })
            .sum()
    }

    // == Background Sweep ==
    /// Starts the periodic expiry sweep, replacing a running one.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_sweep(self: &Arc<Self>, interval: Duration) {
        self.sweep
            .start(Arc::downgrade(self), interval, |caches: &TypedCaches| {
                let removed = caches.clean_expired();
                if removed > 0 {
                    info!(removed, "typed cache sweep removed expired entries");
                } else {
                    debug!("typed cache sweep found no expired entries");
                }
            });
    }

    pub fn stop_sweep(&self) {
        self.sweep.stop();
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep.is_running()
    }

    /// Stops the sweep and drops every typed entry.
    pub fn shutdown(&self) {
        self.stop_sweep();
        let cleared = self.clear_all();
        debug!(cleared, "typed caches shut down");
    }
}

impl fmt::Debug for TypedCaches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("TypedCaches");
        for kind in TypedCacheKind::ALL {
            out.field(kind.as_str(), &self.len(kind));
        }
        out.field("sweeping", &self.is_sweeping()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn typed(max_entries: usize) -> (TypedCaches, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let caches = TypedCaches::with_clock(
            TypedCacheConfig {
                max_entries,
                default_ttl_ms: 60_000,
            },
            clock.clone(),
        )
        .unwrap();
        (caches, clock)
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn tagged(tag: &str) -> SetOptions {
        SetOptions::default().tags([tag])
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("headers".parse::<TypedCacheKind>().unwrap(), TypedCacheKind::RequestHeaders);
        assert_eq!("csrf".parse::<TypedCacheKind>().unwrap(), TypedCacheKind::CsrfRequirement);
        assert_eq!("security".parse::<TypedCacheKind>().unwrap(), TypedCacheKind::SecurityHeaders);
        assert!(matches!(
            "cookies".parse::<TypedCacheKind>(),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = TypedCaches::new(TypedCacheConfig {
            max_entries: 0,
            default_ttl_ms: 0,
        });
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_caches_do_not_share_key_space() {
        let (caches, _) = typed(10);
        let key = "GET:/api/users";

        caches.set_request_headers(
            key,
            headers(&[("Accept", "application/json")]),
            SetOptions::default(),
        );
        caches.set_csrf_required(key, false, SetOptions::default());

        assert_eq!(
            caches.get_request_headers(key),
            Some(headers(&[("Accept", "application/json")]))
        );
        assert_eq!(caches.get_csrf_required(key), Some(false));
        assert_eq!(caches.get_security_headers(key), None);
    }

    #[test]
    fn test_get_and_reset_stats() {
        let (caches, _) = typed(10);
        caches.set_csrf_required("POST:/login", true, SetOptions::default());
        caches.get_csrf_required("POST:/login");
        caches.get_csrf_required("POST:/login");
        caches.get_csrf_required("GET:/login");

        let stats = caches.get_and_reset_stats(TypedCacheKind::CsrfRequirement);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_ratio - 2.0 / 3.0).abs() < 1e-9);

        let after = caches.stats(TypedCacheKind::CsrfRequirement);
        assert_eq!((after.hits, after.misses, after.size), (0, 0, 1));
        assert_eq!(after.hit_ratio, 0.0);
    }

    #[test]
    fn test_reset_stats() {
        let (caches, _) = typed(10);
        caches.get_request_headers("missing");
        caches.reset_stats(TypedCacheKind::RequestHeaders);
        assert_eq!(caches.stats(TypedCacheKind::RequestHeaders).misses, 0);
    }

    #[test]
    fn test_invalidate_by_tag_spans_all_typed_caches() {
        let (caches, _) = typed(10);
        caches.set_request_headers("GET:/users", headers(&[]), tagged("users"));
        caches.set_csrf_required("POST:/users", true, tagged("users"));
        caches.set_security_headers("GET:/users", headers(&[]), tagged("users"));
        caches.set_security_headers("GET:/roles", headers(&[]), tagged("roles"));

        assert_eq!(caches.invalidate_by_tag("users"), 3);

        assert_eq!(caches.get_request_headers("GET:/users"), None);
        assert_eq!(caches.get_csrf_required("POST:/users"), None);
        assert_eq!(caches.get_security_headers("GET:/users"), None);
        assert!(caches.get_security_headers("GET:/roles").is_some());
        assert_eq!(caches.invalidate_by_tag("users"), 0);
    }

    #[test]
    fn test_invalidate_by_url_pattern_is_scoped_to_kind() {
        let (caches, _) = typed(10);
        caches.set_csrf_required("POST:/api/users/1", true, SetOptions::default());
        caches.set_csrf_required("POST:/api/roles/1", true, SetOptions::default());
        caches.set_request_headers("GET:/api/users/1", headers(&[]), SetOptions::default());

        assert_eq!(
            caches.invalidate_by_url_pattern(TypedCacheKind::CsrfRequirement, "/users"),
            1
        );
        assert_eq!(caches.len(TypedCacheKind::CsrfRequirement), 1);
        assert_eq!(caches.len(TypedCacheKind::RequestHeaders), 1);
    }

    #[test]
    fn test_remove_clear_and_clear_all() {
        let (caches, _) = typed(10);
        caches.set_csrf_required("a", true, tagged("t"));
        caches.set_csrf_required("b", true, SetOptions::default());
        caches.set_security_headers("c", headers(&[]), SetOptions::default());

        assert!(caches.remove(TypedCacheKind::CsrfRequirement, "a"));
        assert!(!caches.remove(TypedCacheKind::CsrfRequirement, "a"));
        assert_eq!(caches.clear(TypedCacheKind::CsrfRequirement), 1);
        assert_eq!(caches.clear_all(), 1);
        assert_eq!(caches.invalidate_by_tag("t"), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_by_insertion() {
        let (caches, _) = typed(5);
        for i in 0..5 {
            caches.set_csrf_required(format!("k{}", i), true, SetOptions::default());
        }
        // Reads do not protect an entry from insertion-order eviction
        caches.get_csrf_required("k0");

        caches.set_csrf_required("k5", true, SetOptions::default());

        // 6 entries over a ceiling of 5: ceil(6 / 5) = 2 oldest dropped
        assert_eq!(caches.len(TypedCacheKind::CsrfRequirement), 4);
        assert_eq!(caches.get_csrf_required("k0"), None);
        assert_eq!(caches.get_csrf_required("k1"), None);
        assert_eq!(caches.get_csrf_required("k5"), Some(true));
    }

    #[test]
    fn test_ttl_and_clean_expired() {
        let (caches, clock) = typed(10);
        caches.set_request_headers("short", headers(&[]), SetOptions::default().ttl_ms(100));
        caches.set_csrf_required("short", true, SetOptions::default().ttl_ms(100).tags(["t"]));
        caches.set_security_headers("long", headers(&[]), SetOptions::default());

        assert!(caches.get_request_headers("short").is_some());
        clock.advance(100);

        assert_eq!(caches.clean_expired(), 2);
        assert!(caches.get_security_headers("long").is_some());
        assert_eq!(caches.invalidate_by_tag("t"), 0);
    }

    #[tokio::test]
    async fn test_background_sweep() {
        let clock = Arc::new(ManualClock::new(1_000));
        let caches = Arc::new(
            TypedCaches::with_clock(
                TypedCacheConfig {
                    max_entries: 10,
                    default_ttl_ms: 50,
                },
                clock.clone(),
            )
            .unwrap(),
        );
        caches.set_csrf_required("k", true, SetOptions::default());
        clock.advance(50);

        caches.start_sweep(Duration::from_millis(20));
        assert!(caches.is_sweeping());
        tokio::time::sleep(Duration::from_millis(120)).await;
        caches.stop_sweep();

        assert_eq!(caches.len(TypedCacheKind::CsrfRequirement), 0);
        assert!(!caches.is_sweeping());
    }
}
