//! API Routes
//!
//! Configures the Axum router with all template service endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    config_handler, empty_handler, health_handler, list_handler, remove_handler, render_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /render/*name` - Render a template through the cache
/// - `GET /templates` - List templates in memory
/// - `DELETE /templates` - Drop every template from memory
/// - `DELETE /templates/*name` - Drop one template from memory
/// - `PUT /config` - Update cache configuration
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
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
        .route("/render/*name", post(render_handler))
        .route("/templates", get(list_handler).delete(empty_handler))
        .route("/templates/*name", delete(remove_handler))
        .route("/config", put(config_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
