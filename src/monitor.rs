//! Cache Monitor
//!
//! Process-wide housekeeping for registered caches: periodic statistics
//! reports and expired-entry sweeps, plus administrative bulk clears.
//!
//! The monitor is either stopped (initial) or running. `start_monitoring`
//! moves it to running, restarting the timer if it already was;
//! `stop_monitoring` moves it back. Registered caches are untouched by either
//! transition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheInstance, CacheStats, HotPath};
use crate::tasks::PeriodicTask;

/// Number of hot paths included in each report.
const REPORT_HOT_PATHS: usize = 3;

// == Monitored Cache ==
/// Operations the monitor needs from a cache, independent of its value type.
pub trait MonitoredCache: Send + Sync {
    fn stats(&self) -> CacheStats;
    fn hot_paths(&self, n: usize) -> Vec<HotPath>;
    fn clean_expired(&self) -> usize;
    fn clear(&self) -> usize;
    fn invalidate_by_tag(&self, tag: &str) -> usize;
}

impl<V: Send + 'static> MonitoredCache for CacheInstance<V> {
    fn stats(&self) -> CacheStats {
        CacheInstance::stats(self)
    }

    fn hot_paths(&self, n: usize) -> Vec<HotPath> {
        CacheInstance::hot_paths(self, n)
    }

    fn clean_expired(&self) -> usize {
        CacheInstance::clean_expired(self)
    }

    fn clear(&self) -> usize {
        CacheInstance::clear(self)
    }

    fn invalidate_by_tag(&self, tag: &str) -> usize {
        CacheInstance::invalidate_by_tag(self, tag)
    }
}

// == Monitor Report ==
/// Per-cache figures emitted on every monitor tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorReport {
    pub name: String,
    pub entries: usize,
    pub size_kb: f64,
    pub avg_access_count: f64,
    /// entries / max_entries, as a percentage
    pub usage_percent: f64,
    /// bytes / max_bytes, as a percentage
    pub memory_percent: f64,
    pub hot_paths: Vec<HotPath>,
}

impl MonitorReport {
    fn new(name: &str, cache: &dyn MonitoredCache) -> Self {
        let stats = cache.stats();
        Self {
            name: name.to_string(),
            entries: stats.entries,
            size_kb: stats.bytes as f64 / 1024.0,
            avg_access_count: stats.avg_access_count,
            usage_percent: stats.usage_ratio() * 100.0,
            memory_percent: stats.memory_ratio() * 100.0,
            hot_paths: cache.hot_paths(REPORT_HOT_PATHS),
        }
    }
}

// == Cache Monitor ==
/// Periodic statistics and sweeping across a set of named caches.
pub struct CacheMonitor {
    caches: RwLock<HashMap<String, Arc<dyn MonitoredCache>>>,
    task: PeriodicTask,
}

impl CacheMonitor {
    pub fn new() -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
            task: PeriodicTask::new("cache-monitor"),
        }
    }

    // == Register ==
    /// Adds a cache to the monitored set. Re-registering a name replaces the
    /// previous cache.
    pub fn register(&self, name: impl Into<String>, cache: Arc<dyn MonitoredCache>) {
        let name = name.into();
        if self.caches.write().insert(name.clone(), cache).is_some() {
            debug!(name = %name, "replaced monitored cache");
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.caches.write().remove(name).is_some()
    }

    /// Returns the monitored cache names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    // == Start Monitoring ==
    /// Starts the recurring report-and-sweep tick, replacing any running timer.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_monitoring(self: &Arc<Self>, interval: Duration) {
        let restarted = self
            .task
            .start(Arc::downgrade(self), interval, |monitor: &CacheMonitor| {
                monitor.tick()
            });
        info!(
            interval_ms = interval.as_millis() as u64,
            restarted, "cache monitoring started"
        );
    }

    /// Cancels the timer. Safe to call when not running.
    pub fn stop_monitoring(&self) {
        if self.task.stop() {
            info!("cache monitoring stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Stops monitoring and releases the timer.
    pub fn shutdown(&self) {
        self.stop_monitoring();
        debug!(caches = self.caches.read().len(), "cache monitor shut down");
    }

    fn tick(&self) {
        self.log_all_stats();

        let removed = self.clean_expired_entries();
        if removed > 0 {
            info!(removed, "monitor sweep removed expired entries");
        } else {
            debug!("monitor sweep found no expired entries");
        }
    }

    // == Log All Stats ==
    /// Builds a report for every monitored cache and logs them as one record.
    pub fn log_all_stats(&self) -> Vec<MonitorReport> {
        let mut reports: Vec<MonitorReport> = self
            .snapshot()
            .iter()
            .map(|(name, cache)| MonitorReport::new(name, cache.as_ref()))
            .collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));

        if reports.is_empty() {
            debug!("no caches registered with monitor");
            return reports;
        }

        let total_entries: usize = reports.iter().map(|r| r.entries).sum();
        let details = serde_json::to_string(&reports).unwrap_or_default();
        info!(
            caches = reports.len(),
            total_entries,
            details = %details,
            "cache statistics"
        );
        reports
    }

    // == Clean Expired Entries ==
    /// Sweeps every monitored cache. Returns the total number removed.
    pub fn clean_expired_entries(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|(_, cache)| cache.clean_expired())
            .sum()
    }

    pub fn clear_all_caches(&self) -> usize {
        let removed: usize = self
            .snapshot()
            .iter()
            .map(|(_, cache)| cache.clear())
            .sum();
        info!(removed, "cleared all monitored caches");
        removed
    }

    /// Clears every cache whose name contains `pattern`. Returns the number of
    /// caches cleared.
    pub fn clear_caches_by_pattern(&self, pattern: &str) -> usize {
        let matching: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|(name, _)| name.contains(pattern))
            .collect();

        for (name, cache) in &matching {
            let removed = cache.clear();
            debug!(name = %name, removed, "cleared cache by pattern");
        }
        info!(pattern = pattern, caches = matching.len(), "cleared caches by pattern");
        matching.len()
    }

    // == Invalidate By Tag In All Caches ==
    /// Invalidates `tag` in every monitored cache, regardless of which tags a
    /// cache declared. Catches per-entry tags the registry index never saw.
    pub fn invalidate_by_tag_in_all_caches(&self, tag: &str) -> usize {
        let removed: usize = self
            .snapshot()
            .iter()
            .map(|(_, cache)| cache.invalidate_by_tag(tag))
            .sum();
        debug!(tag = tag, removed, "monitor tag invalidation");
        removed
    }

    /// Copies the registration map so cache work runs without the monitor lock.
    fn snapshot(&self) -> Vec<(String, Arc<dyn MonitoredCache>)> {
        self.caches
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), cache.clone()))
            .collect()
    }
}

impl Default for CacheMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMonitor")
            .field("caches", &self.names())
            .field("running", &self.is_running())
            .finish()
    }
}
