//! API router configuration
//!
//! Defines all API routes and middleware.

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Networks
        .route(
            "/api/v1/networks",
            get(handlers::list_networks).post(handlers::create_network),
        )
        .route("/api/v1/networks/:id", get(handlers::get_network))
        .route(
            "/api/v1/networks/:id/addresses",
            get(handlers::list_network_addresses),
        )
        // Addresses
        .route("/api/v1/addresses", post(handlers::allocate_address))
        .route(
            "/api/v1/addresses/:id",
            get(handlers::get_address)
                .put(handlers::rename_address)
                .delete(handlers::release_address),
        )
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness_check() -> &'static str {
    "READY"
}
