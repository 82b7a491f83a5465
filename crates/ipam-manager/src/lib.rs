//! IP Address Management
//!
//! Tracks address pools (networks: a CIDR block plus a reserved gateway) and
//! the individual addresses allocated from them, each bound to a hostname:
//! - First-available or explicit address allocation
//! - Per-network hostname uniqueness
//! - Release and rename
//!
//! Allocation decisions are made and persisted as one atomic unit by an
//! [`AllocationStore`](store::AllocationStore). Two stores ship with the crate:
//! an in-memory one and, behind the `postgres` feature, a PostgreSQL one.

pub mod allocator;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

// Re-export core types
pub use allocator::AddressSpace;
pub use api::{create_router, start_server, AppState};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use models::{AddressRecord, AddressStatus, AllocationRequest, Network};
pub use service::IpamManager;
pub use store::{AllocationStore, MemoryStore};
#[cfg(feature = "postgres")]
pub use store::PgStore;
