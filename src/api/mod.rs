//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` / `POST /caches` - List caches with stats / create a cache
//! - `GET /caches/:name/stats`, `GET /caches/:name/hot?limit=n`
//! - `PUT|GET|DELETE /caches/:name/entries/:key` - Entry access
//! - `DELETE /caches/:name` - Clear one cache
//! - `POST /caches/:name/invalidate` - Prefix invalidation
//! - `POST /tags/:tag/invalidate` - Tag invalidation across every cache
//! - `POST /maintenance/clean`, `POST /maintenance/clear` - Sweeps and bulk clears
//! - `GET /typed/:kind/stats?reset=bool` - Typed cache counters

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
