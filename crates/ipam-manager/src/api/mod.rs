//! REST API for address management
//!
//! Provides HTTP endpoints for managing networks and address allocations.
//!
//! # Endpoints
//!
//! ## Networks
//! - `GET /api/v1/networks` - List all networks
//! - `POST /api/v1/networks` - Create a network
//! - `GET /api/v1/networks/:id` - Get network details
//! - `GET /api/v1/networks/:id/addresses` - List address records of a network
//!
//! ## Addresses
//! - `POST /api/v1/addresses` - Allocate an address
//! - `GET /api/v1/addresses/:id` - Get an address record
//! - `PUT /api/v1/addresses/:id` - Change the hostname of an address
//! - `DELETE /api/v1/addresses/:id` - Release an address
//!
//! ## Health
//! - `GET /health` - Health check
//! - `GET /ready` - Readiness check

pub mod dto;
pub mod handlers;
pub mod router;
pub mod state;

pub use dto::*;
pub use router::create_router;
pub use state::AppState;

use crate::config::ServerConfig;
use std::sync::Arc;

/// Start the API server
///
/// # Example
///
/// ```ignore
/// use ipam_manager::api::{start_server, AppState};
/// use ipam_manager::config::ServerConfig;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let state = Arc::new(AppState::new());
///     start_server(state, &ServerConfig::default()).await.unwrap();
/// }
/// ```
pub async fn start_server(state: Arc<AppState>, config: &ServerConfig) -> Result<(), std::io::Error> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr()).await?;

    tracing::info!("Starting API server on {}", config.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
