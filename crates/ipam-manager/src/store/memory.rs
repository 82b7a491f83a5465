//! In-process allocation store
//!
//! All tables live behind a single mutex; holding it for the whole of an
//! operation is the atomic unit. Writes are applied only after every check of
//! the operation has passed, so a failing call leaves the tables untouched.

use super::AllocationStore;
use crate::allocator::AddressSpace;
use crate::models::{AddressRecord, AddressStatus, AllocationRequest, Network};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use tracing::debug;

/// Where a candidate address stands in one network
enum Slot {
    /// No record has ever existed for the address
    Vacant,
    /// A released record exists and can be reclaimed
    Released(i64),
    /// An allocated record holds the address
    Taken,
}

#[derive(Debug, Default)]
struct Tables {
    networks: BTreeMap<i64, Network>,
    addresses: BTreeMap<i64, AddressRecord>,
    /// (network, address) -> record id, one row per pair
    slots: HashMap<(i64, IpAddr), i64>,
    /// (network, hostname) -> record id, allocated records only
    hostnames: HashMap<(i64, String), i64>,
    last_network_id: i64,
    last_address_id: i64,
}

impl Tables {
    fn network(&self, id: i64) -> Result<&Network> {
        self.networks.get(&id).ok_or(Error::NetworkNotFound(id))
    }

    fn slot(&self, network_id: i64, addr: IpAddr) -> Slot {
        match self.slots.get(&(network_id, addr)) {
            None => Slot::Vacant,
            Some(&id) => match self.addresses.get(&id) {
                Some(record) if record.is_allocated() => Slot::Taken,
                _ => Slot::Released(id),
            },
        }
    }

    fn hostname_holder(&self, network_id: i64, hostname: &str) -> Option<i64> {
        self.hostnames
            .get(&(network_id, hostname.to_string()))
            .copied()
    }

    /// Conditional write: claims `addr` only if it is not currently allocated
    fn claim(&mut self, network_id: i64, addr: IpAddr, hostname: &str) -> Option<AddressRecord> {
        let id = match self.slot(network_id, addr) {
            Slot::Taken => return None,
            Slot::Released(id) => id,
            Slot::Vacant => {
                self.last_address_id += 1;
                let id = self.last_address_id;
                self.slots.insert((network_id, addr), id);
                id
            }
        };

        let record = AddressRecord {
            id,
            network_id,
            address: addr,
            hostname: Some(hostname.to_string()),
            status: AddressStatus::Allocated,
        };
        self.addresses.insert(id, record.clone());
        self.hostnames.insert((network_id, hostname.to_string()), id);
        Some(record)
    }
}

/// Allocation store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AllocationStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_network(&self, space: AddressSpace) -> Result<Network> {
        let mut tables = self.tables.lock();
        tables.last_network_id += 1;

        let network = Network {
            id: tables.last_network_id,
            cidr: space.cidr(),
            gateway: space.gateway(),
        };
        tables.networks.insert(network.id, network.clone());
        Ok(network)
    }

    async fn get_network(&self, id: i64) -> Result<Network> {
        self.tables.lock().network(id).cloned()
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Ok(self.tables.lock().networks.values().cloned().collect())
    }

    async fn allocate(&self, request: AllocationRequest) -> Result<AddressRecord> {
        let mut tables = self.tables.lock();
        let space = tables.network(request.network_id)?.address_space();
        if let Some(addr) = request.requested_address {
            space.check_allocatable(addr)?;
        }

        if tables
            .hostname_holder(request.network_id, &request.hostname)
            .is_some()
        {
            return Err(Error::HostnameInUse {
                hostname: request.hostname,
                network_id: request.network_id,
            });
        }

        match request.requested_address {
            Some(addr) => tables
                .claim(request.network_id, addr, &request.hostname)
                .ok_or(Error::AddressAlreadyAllocated(addr)),
            None => {
                for candidate in space.candidates() {
                    if let Some(record) =
                        tables.claim(request.network_id, candidate, &request.hostname)
                    {
                        return Ok(record);
                    }
                    debug!(address = %candidate, "candidate taken, trying next");
                }
                Err(Error::NoAvailableAddresses(request.network_id))
            }
        }
    }

    async fn release(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.lock();
        let record = tables
            .addresses
            .get_mut(&id)
            .ok_or(Error::AddressNotFound(id))?;

        let network_id = record.network_id;
        let hostname = record.hostname.take();
        record.status = AddressStatus::Available;

        if let Some(hostname) = hostname {
            tables.hostnames.remove(&(network_id, hostname));
        }
        Ok(())
    }

    async fn update_hostname(&self, id: i64, hostname: &str) -> Result<()> {
        let mut tables = self.tables.lock();
        let record = tables
            .addresses
            .get(&id)
            .cloned()
            .ok_or(Error::AddressNotFound(id))?;
        tables.network(record.network_id)?;

        if !record.is_allocated() {
            return Err(Error::AddressNotAllocated(id));
        }

        match tables.hostname_holder(record.network_id, hostname) {
            Some(holder) if holder != id => {
                return Err(Error::HostnameInUse {
                    hostname: hostname.to_string(),
                    network_id: record.network_id,
                });
            }
            _ => {}
        }

        if let Some(old) = record.hostname {
            tables.hostnames.remove(&(record.network_id, old));
        }
        tables
            .hostnames
            .insert((record.network_id, hostname.to_string()), id);
        if let Some(stored) = tables.addresses.get_mut(&id) {
            stored.hostname = Some(hostname.to_string());
        }
        Ok(())
    }

    async fn get_address(&self, id: i64) -> Result<AddressRecord> {
        self.tables
            .lock()
            .addresses
            .get(&id)
            .cloned()
            .ok_or(Error::AddressNotFound(id))
    }

    async fn list_addresses(&self, network_id: i64) -> Result<Vec<AddressRecord>> {
        let tables = self.tables.lock();
        tables.network(network_id)?;

        Ok(tables
            .addresses
            .values()
            .filter(|r| r.network_id == network_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    async fn store_with(cidr: &str, gateway: &str) -> (MemoryStore, Network) {
        let store = MemoryStore::new();
        let network = store
            .create_network(AddressSpace::parse(cidr, gateway).unwrap())
            .await
            .unwrap();
        (store, network)
    }

    #[tokio::test]
    async fn test_network_ids_follow_insertion_order() {
        let store = MemoryStore::new();
        for cidr in ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"] {
            let gw = cidr.replace(".0/24", ".1");
            store
                .create_network(AddressSpace::parse(cidr, &gw).unwrap())
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .list_networks()
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_first_available_skips_taken() {
        let (store, net) = store_with("10.0.0.0/29", "10.0.0.1").await;

        store
            .allocate(AllocationRequest::explicit(net.id, ip("10.0.0.2"), "pinned"))
            .await
            .unwrap();
        let record = store
            .allocate(AllocationRequest::first_available(net.id, "next"))
            .await
            .unwrap();

        assert_eq!(record.address, ip("10.0.0.3"));
        assert_eq!(record.status, AddressStatus::Allocated);
    }

    #[tokio::test]
    async fn test_failed_allocation_writes_nothing() {
        let (store, net) = store_with("10.0.0.0/30", "10.0.0.1").await;
        store
            .allocate(AllocationRequest::first_available(net.id, "h1"))
            .await
            .unwrap();

        let err = store
            .allocate(AllocationRequest::explicit(net.id, ip("10.0.0.3"), "h1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HostnameInUse { .. }));

        let records = store.list_addresses(net.id).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_released_slot_is_reclaimed_in_place() {
        let (store, net) = store_with("10.0.0.0/29", "10.0.0.1").await;

        let first = store
            .allocate(AllocationRequest::first_available(net.id, "a"))
            .await
            .unwrap();
        store
            .allocate(AllocationRequest::first_available(net.id, "b"))
            .await
            .unwrap();
        store.release(first.id).await.unwrap();

        let again = store
            .allocate(AllocationRequest::first_available(net.id, "c"))
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.address, first.address);
        assert_eq!(again.hostname.as_deref(), Some("c"));
        assert_eq!(store.list_addresses(net.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_release_frees_hostname() {
        let (store, net) = store_with("10.0.0.0/29", "10.0.0.1").await;

        let record = store
            .allocate(AllocationRequest::first_available(net.id, "web"))
            .await
            .unwrap();
        store.release(record.id).await.unwrap();

        let reused = store
            .allocate(AllocationRequest::explicit(net.id, ip("10.0.0.5"), "web"))
            .await
            .unwrap();
        assert_eq!(reused.hostname.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_rename_to_own_hostname_is_noop() {
        let (store, net) = store_with("10.0.0.0/29", "10.0.0.1").await;
        let record = store
            .allocate(AllocationRequest::first_available(net.id, "db"))
            .await
            .unwrap();

        store.update_hostname(record.id, "db").await.unwrap();
        store.update_hostname(record.id, "db-primary").await.unwrap();

        // old name is free again
        store
            .allocate(AllocationRequest::first_available(net.id, "db"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rename_released_record_rejected() {
        let (store, net) = store_with("10.0.0.0/29", "10.0.0.1").await;
        let record = store
            .allocate(AllocationRequest::first_available(net.id, "tmp"))
            .await
            .unwrap();
        store.release(record.id).await.unwrap();

        let err = store.update_hostname(record.id, "again").await.unwrap_err();
        assert!(matches!(err, Error::AddressNotAllocated(_)));
    }

    #[tokio::test]
    async fn test_list_addresses_unknown_network() {
        let store = MemoryStore::new();
        let err = store.list_addresses(42).await.unwrap_err();
        assert!(matches!(err, Error::NetworkNotFound(42)));
    }
}
