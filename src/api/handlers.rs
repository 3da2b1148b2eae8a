//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Handlers are thin: they
//! resolve the target cache, call the engine and shape the response.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::cache::{CacheRegistry, InstanceConfig, NamedCacheConfig, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheCreatedResponse, CacheStatsResponse, CachesResponse, ClearRequest, ClearResponse,
    DeleteResponse, EntryResponse, HealthResponse, HotPathsQuery, HotPathsResponse,
    InvalidatePrefixRequest, RemovedResponse, SetEntryRequest, SetEntryResponse,
    TagInvalidationResponse, TypedStatsQuery, TypedStatsResponse,
};
use crate::monitor::CacheMonitor;
use crate::typed::{TypedCacheConfig, TypedCacheKind, TypedCaches};

/// Application state shared across all handlers.
///
/// Registry caches are auto-registered with the monitor, so monitor-wide
/// operations (sweeps, bulk clears, tag fan-out) reach every one of them.
#[derive(Clone)]
pub struct AppState {
    /// Named caches of JSON values
    pub registry: Arc<CacheRegistry<Value>>,
    pub monitor: Arc<CacheMonitor>,
    pub typed: Arc<TypedCaches>,
}

impl AppState {
    pub fn new(
        registry: Arc<CacheRegistry<Value>>,
        monitor: Arc<CacheMonitor>,
        typed: Arc<TypedCaches>,
    ) -> Self {
        Self {
            registry,
            monitor,
            typed,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`] if the configured budgets are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = InstanceConfig::from(config);
        defaults.validate()?;

        let monitor = Arc::new(CacheMonitor::new());
        let registry = CacheRegistry::new(defaults).with_monitor(monitor.clone());
        let typed = TypedCaches::new(TypedCacheConfig::from(config))?;

        Ok(Self::new(Arc::new(registry), monitor, Arc::new(typed)))
    }

    /// Resolves an existing cache or answers 404.
    fn cache(&self, name: &str) -> Result<SharedCache<Value>> {
        self.registry
            .lookup(name)
            .ok_or_else(|| CacheError::NotFound(format!("cache '{}'", name)))
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.registry.names().len(),
        state.monitor.is_running(),
    ))
}

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    Json(CachesResponse {
        caches: state.registry.all_stats(),
    })
}

/// Handler for POST /caches
///
/// Creates a named cache. An existing name keeps its original configuration.
pub async fn create_cache_handler(
    State(state): State<AppState>,
    Json(config): Json<NamedCacheConfig>,
) -> Result<(StatusCode, Json<CacheCreatedResponse>)> {
    let existed = state.registry.lookup(&config.name).is_some();
    let cache = state.registry.get_or_create(&config)?;

    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(CacheCreatedResponse::new(config.name, !existed, cache.config())),
    ))
}

/// Handler for GET /caches/:name/stats
pub async fn cache_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CacheStatsResponse>> {
    let stats = state.cache(&name)?.stats();
    Ok(Json(CacheStatsResponse::new(name, stats)))
}

/// Handler for GET /caches/:name/hot
pub async fn hot_paths_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HotPathsQuery>,
) -> Result<Json<HotPathsResponse>> {
    let hot_paths = state.cache(&name)?.hot_paths(query.limit());
    Ok(Json(HotPathsResponse { name, hot_paths }))
}

/// Handler for PUT /caches/:name/entries/:key
///
/// Writes through the registry, creating the cache with default budgets on
/// first use.
pub async fn set_entry_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Json(req): Json<SetEntryRequest>,
) -> Result<Json<SetEntryResponse>> {
    if let Some(error_msg) = req.validate(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let config = state
        .registry
        .registered_config(&name)
        .unwrap_or_else(|| NamedCacheConfig::named(name.as_str()));
    let (value, options) = req.into_parts();
    state.registry.set_with(&config, &key, value, options)?;

    Ok(Json(SetEntryResponse::new(name, key)))
}

/// Handler for GET /caches/:name/entries/:key
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<EntryResponse>> {
    let value = state
        .cache(&name)?
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(format!("key '{}' in cache '{}'", key, name)))?;

    Ok(Json(EntryResponse::new(name, key, value)))
}

/// Handler for DELETE /caches/:name/entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache(&name)?.remove(&key) {
        return Err(CacheError::NotFound(format!(
            "key '{}' in cache '{}'",
            key, name
        )));
    }

    Ok(Json(DeleteResponse::new(name, key)))
}

/// Handler for DELETE /caches/:name
///
/// Empties the cache; the cache itself stays registered.
pub async fn clear_cache_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RemovedResponse>> {
    let removed = state.cache(&name)?.clear();
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for POST /caches/:name/invalidate
pub async fn invalidate_prefix_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<InvalidatePrefixRequest>,
) -> Result<Json<RemovedResponse>> {
    let removed = state.cache(&name)?.invalidate_by_prefix(&req.prefix);
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for POST /tags/:tag/invalidate
///
/// Runs the registry fan-out first, then the monitor-wide pass for per-entry
/// tags, then the typed caches.
pub async fn invalidate_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<TagInvalidationResponse> {
    let removed = state.registry.invalidate_by_tag(&tag)
        + state.monitor.invalidate_by_tag_in_all_caches(&tag);
    let typed_removed = state.typed.invalidate_by_tag(&tag);

    info!(tag = %tag, removed, typed_removed, "tag invalidated");
    Json(TagInvalidationResponse {
        tag,
        removed,
        typed_removed,
    })
}

/// Handler for POST /maintenance/clean
pub async fn clean_expired_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.monitor.clean_expired_entries() + state.typed.clean_expired();
    Json(RemovedResponse::new(removed))
}

/// Handler for POST /maintenance/clear
pub async fn clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Json<ClearResponse> {
    match req.pattern {
        Some(pattern) => {
            let cleared = state.monitor.clear_caches_by_pattern(&pattern);
            Json(ClearResponse::by_pattern(pattern, cleared))
        }
        None => {
            let removed = state.monitor.clear_all_caches() + state.typed.clear_all();
            Json(ClearResponse::all(removed))
        }
    }
}

/// Handler for GET /typed/:kind/stats
pub async fn typed_stats_handler(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<TypedStatsQuery>,
) -> Result<Json<TypedStatsResponse>> {
    let kind: TypedCacheKind = kind.parse()?;
    let stats = if query.reset {
        state.typed.get_and_reset_stats(kind)
    } else {
        state.typed.stats(kind)
    };

    Ok(Json(TypedStatsResponse {
        kind,
        stats,
        reset: query.reset,
    }))
}
