//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, clean_expired_handler, clear_cache_handler, clear_handler,
    create_cache_handler, delete_entry_handler, get_entry_handler, health_handler,
    hot_paths_handler, invalidate_prefix_handler, invalidate_tag_handler, list_caches_handler,
    set_entry_handler, typed_stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/caches", get(list_caches_handler).post(create_cache_handler))
        .route("/caches/:name", delete(clear_cache_handler))
        .route("/caches/:name/stats", get(cache_stats_handler))
        .route("/caches/:name/hot", get(hot_paths_handler))
        .route("/caches/:name/invalidate", post(invalidate_prefix_handler))
        .route(
            "/caches/:name/entries/:key",
            put(set_entry_handler)
                .get(get_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/tags/:tag/invalidate", post(invalidate_tag_handler))
        .route("/maintenance/clean", post(clean_expired_handler))
        .route("/maintenance/clear", post(clear_handler))
        .route("/typed/:kind/stats", get(typed_stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
