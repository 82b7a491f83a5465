//! Application state for the API
//!
//! Holds shared state across all API handlers.

use crate::service::IpamManager;
use crate::store::{AllocationStore, MemoryStore};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Allocation engine
    pub manager: IpamManager,
}

impl AppState {
    /// Create state over an in-memory store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create state over the given store
    pub fn with_store(store: Arc<dyn AllocationStore>) -> Self {
        Self::with_manager(IpamManager::new(store))
    }

    /// Create with custom manager
    pub fn with_manager(manager: IpamManager) -> Self {
        Self { manager }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
