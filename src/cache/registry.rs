//! Cache Registry Module
//!
//! Creates and hands out named cache instances, and fans tag invalidation out
//! to every cache that declared the tag at creation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheInstance, CacheStats, Clock, InstanceConfig, JsonSizeEstimator, NamedCacheConfig,
    SetOptions, SizeEstimator, SystemClock, TagIndex,
};
use crate::error::{CacheError, Result};
use crate::monitor::CacheMonitor;

/// Shared handle to a registry-owned cache.
pub type SharedCache<V> = Arc<CacheInstance<V>>;

// == Cache Registry ==
/// Registry of named caches sharing one value type.
///
/// Creation is idempotent by name and first-writer-wins: once a name exists,
/// later requests get the existing instance even if their configuration
/// differs. Such conflicts are logged at `warn`.
pub struct CacheRegistry<V> {
    defaults: InstanceConfig,
    estimator: Arc<dyn SizeEstimator<V>>,
    clock: Arc<dyn Clock>,
    monitor: Option<Arc<CacheMonitor>>,
    state: RwLock<RegistryState<V>>,
}

struct RegisteredCache<V> {
    /// Configuration the cache was created with
    config: NamedCacheConfig,
    instance: SharedCache<V>,
}

struct RegistryState<V> {
    caches: HashMap<String, RegisteredCache<V>>,
    /// Registry-level tag -> cache names
    tag_index: TagIndex,
}

impl<V: Serialize + Send + 'static> CacheRegistry<V> {
    // == Constructor ==
    /// Creates a registry whose caches size values by their JSON encoding.
    pub fn new(defaults: InstanceConfig) -> Self {
        Self::with_parts(
            defaults,
            Arc::new(JsonSizeEstimator::new()),
            Arc::new(SystemClock),
        )
    }
}

impl<V: Send + 'static> CacheRegistry<V> {
    /// Creates a registry with an explicit estimator and clock, shared by
    /// every cache it creates.
    pub fn with_parts(
        defaults: InstanceConfig,
        estimator: Arc<dyn SizeEstimator<V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            defaults,
            estimator,
            clock,
            monitor: None,
            state: RwLock::new(RegistryState {
                caches: HashMap::new(),
                tag_index: TagIndex::new(),
            }),
        }
    }

    /// Registers every cache created from now on with `monitor`.
    pub fn with_monitor(mut self, monitor: Arc<CacheMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn defaults(&self) -> &InstanceConfig {
        &self.defaults
    }

    // == Get Or Create ==
    /// Returns the cache called `config.name`, creating it on first use.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`] for an empty name or a configuration
    /// that resolves to invalid budgets. Nothing is registered in that case.
    pub fn get_or_create(&self, config: &NamedCacheConfig) -> Result<SharedCache<V>> {
        if let Some(existing) = self.existing(config) {
            return Ok(existing);
        }

        if config.name.is_empty() {
            return Err(CacheError::Config("cache name cannot be empty".to_string()));
        }

        let created = {
            let mut state = self.state.write();
            // Another writer may have won the race since the read above
            if let Some(registered) = state.caches.get(&config.name) {
                return Ok(registered.instance.clone());
            }

            let resolved = config.resolve(&self.defaults);
            let instance = Arc::new(CacheInstance::with_parts(
                resolved,
                self.estimator.clone(),
                self.clock.clone(),
            )?);

            state.tag_index.insert(&config.name, &config.tags);
            state.caches.insert(
                config.name.clone(),
                RegisteredCache {
                    config: config.clone(),
                    instance: instance.clone(),
                },
            );
            instance
        };

        info!(
            name = %config.name,
            max_entries = created.config().max_entries,
            max_bytes = created.config().max_bytes,
            ttl_ms = created.config().default_ttl_ms,
            tags = ?config.tags,
            "created cache"
        );

        if let Some(monitor) = &self.monitor {
            monitor.register(config.name.clone(), created.clone());
        }

        Ok(created)
    }

    /// Looks up an existing cache, warning when the request's configuration
    /// differs from the one it was created with.
    fn existing(&self, config: &NamedCacheConfig) -> Option<SharedCache<V>> {
        let state = self.state.read();
        let registered = state.caches.get(&config.name)?;
        if registered.config != *config {
            warn!(
                name = %config.name,
                requested = ?config,
                active = ?registered.config,
                "cache already exists; ignoring differing configuration"
            );
        }
        Some(registered.instance.clone())
    }

    /// Returns the cache called `name` without creating it.
    pub fn lookup(&self, name: &str) -> Option<SharedCache<V>> {
        self.state
            .read()
            .caches
            .get(name)
            .map(|registered| registered.instance.clone())
    }

    /// Configuration the named cache was created with.
    pub fn registered_config(&self, name: &str) -> Option<NamedCacheConfig> {
        self.state
            .read()
            .caches
            .get(name)
            .map(|registered| registered.config.clone())
    }

    // == Set ==
    /// Writes through the named cache. Entries carry the cache's registry tags
    /// plus `extra_tags`.
    pub fn set<I, S>(
        &self,
        config: &NamedCacheConfig,
        key: &str,
        value: V,
        extra_tags: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_with(config, key, value, SetOptions::default().tags(extra_tags))
    }

    /// Like [`CacheRegistry::set`], with a per-call TTL override.
    pub fn set_with(
        &self,
        config: &NamedCacheConfig,
        key: &str,
        value: V,
        options: SetOptions,
    ) -> Result<()> {
        let cache = self.get_or_create(config)?;
        let options = SetOptions {
            tags: config.tags.iter().cloned().chain(options.tags).collect(),
            ..options
        };
        cache.set_with(key, value, options);
        Ok(())
    }

    // == Get ==
    /// Reads through the named cache, creating it if needed.
    pub fn get(&self, config: &NamedCacheConfig, key: &str) -> Result<Option<V>>
    where
        V: Clone,
    {
        Ok(self.get_or_create(config)?.get(key))
    }

    // == Invalidate By Tag ==
    /// Invalidates `tag` in every cache that declared it as a registry tag.
    /// Returns the total number of removed entries.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let targets: Vec<(String, SharedCache<V>)> = {
            let state = self.state.read();
            state
                .tag_index
                .members(tag)
                .into_iter()
                .flatten()
                .filter_map(|name| {
                    state
                        .caches
                        .get(name)
                        .map(|registered| (name.clone(), registered.instance.clone()))
                })
                .collect()
        };

        let removed: usize = targets
            .iter()
            .map(|(_, cache)| cache.invalidate_by_tag(tag))
            .sum();
        debug!(
            tag = tag,
            caches = ?targets.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            removed,
            "registry tag invalidation"
        );
        removed
    }

    /// Removes keys starting with `prefix` from the named cache. Unknown names remove nothing.
    pub fn invalidate_by_prefix(&self, name: &str, prefix: &str) -> usize {
        self.lookup(name)
            .map_or(0, |cache| cache.invalidate_by_prefix(prefix))
    }

    pub fn clear(&self, name: &str) -> usize {
        self.lookup(name).map_or(0, |cache| cache.clear())
    }

    pub fn clear_all(&self) -> usize {
        self.instances().iter().map(|(_, cache)| cache.clear()).sum()
    }

    /// Sweeps expired entries from every cache and returns the total removed.
    pub fn clean_expired_all(&self) -> usize {
        self.instances()
            .iter()
            .map(|(_, cache)| cache.clean_expired())
            .sum()
    }

    pub fn stats(&self, name: &str) -> Option<CacheStats> {
        self.lookup(name).map(|cache| cache.stats())
    }

    pub fn all_stats(&self) -> BTreeMap<String, CacheStats> {
        self.instances()
            .into_iter()
            .map(|(name, cache)| (name, cache.stats()))
            .collect()
    }

    /// Returns the registered cache names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().caches.keys().cloned().collect();
        names.sort();
        names
    }

    // == Drop Cache ==
    /// Forgets the named cache, its registry tags and its monitor registration.
    /// Handles already given out keep working but are no longer reachable by name.
    pub fn drop_cache(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            match state.caches.remove(name) {
                Some(registered) => {
                    state.tag_index.remove(&name.to_string(), &registered.config.tags);
                    true
                }
                None => false,
            }
        };

        if removed {
            if let Some(monitor) = &self.monitor {
                monitor.unregister(name);
            }
            info!(name = name, "dropped cache");
        }
        removed
    }

    /// Snapshot of every registered cache, taken so callers run outside the registry lock.
    fn instances(&self) -> Vec<(String, SharedCache<V>)> {
        self.state
            .read()
            .caches
            .iter()
            .map(|(name, registered)| (name.clone(), registered.instance.clone()))
            .collect()
    }
}

impl<V> fmt::Debug for CacheRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CacheRegistry")
            .field("defaults", &self.defaults)
            .field("caches", &state.caches.keys().collect::<Vec<_>>())
            .finish()
    }
}
