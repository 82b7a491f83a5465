//! Allocation store
//!
//! Durable storage for networks and address records. Every mutating operation
//! runs as one atomic unit: all reads and writes of the call observe a single
//! consistent state and either all take effect or none do. Exclusivity of
//! addresses and hostnames is enforced here and nowhere else.
//!
//! Two backends:
//! - [`MemoryStore`]: process-local tables behind one mutex
//! - `PgStore` (feature `postgres`): PostgreSQL transactions with unique
//!   constraints closing the concurrent-insert window

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::allocator::AddressSpace;
use crate::models::{AddressRecord, AllocationRequest, Network};
use crate::Result;
use async_trait::async_trait;

/// Transactional storage for networks and address records
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Short backend name, for logs
    fn backend(&self) -> &'static str;

    /// Persist a new network and return it with its assigned id
    async fn create_network(&self, space: AddressSpace) -> Result<Network>;

    /// Fetch a network, failing with `NetworkNotFound`
    async fn get_network(&self, id: i64) -> Result<Network>;

    /// All networks in insertion order
    async fn list_networks(&self) -> Result<Vec<Network>>;

    /// Allocate an address
    ///
    /// Within one atomic unit: the network must exist, the hostname must not
    /// be held by another allocated record of the network, and then either
    /// the requested address or the lowest free candidate is claimed.
    /// Released records for the claimed address are reclaimed in place.
    async fn allocate(&self, request: AllocationRequest) -> Result<AddressRecord>;

    /// Mark a record available and clear its hostname
    async fn release(&self, id: i64) -> Result<()>;

    /// Change the hostname of an allocated record
    async fn update_hostname(&self, id: i64, hostname: &str) -> Result<()>;

    /// Fetch an address record, failing with `AddressNotFound`
    async fn get_address(&self, id: i64) -> Result<AddressRecord>;

    /// All records of a network in ascending id order
    async fn list_addresses(&self, network_id: i64) -> Result<Vec<AddressRecord>>;
}
