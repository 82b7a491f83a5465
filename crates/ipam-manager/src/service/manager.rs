//! IPAM manager service
//!
//! Entry point for every operation exposed to callers:
//! - Network creation and lookup
//! - Address allocation (explicit or first-available)
//! - Release and hostname rename
//!
//! Syntax checks happen here, before anything reaches the store. Exclusivity
//! invariants are the store's responsibility.

use crate::allocator::AddressSpace;
use crate::models::{AddressRecord, AllocationRequest, Network};
use crate::store::AllocationStore;
use crate::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Longest accepted hostname (DNS name limit)
pub const MAX_HOSTNAME_LEN: usize = 253;

/// IPAM manager - allocation engine over an injected store
#[derive(Clone)]
pub struct IpamManager {
    store: Arc<dyn AllocationStore>,
}

impl IpamManager {
    /// Create a manager over the given store
    pub fn new(store: Arc<dyn AllocationStore>) -> Self {
        Self { store }
    }

    // ==================== Network Operations ====================

    /// Create a network from a CIDR string and a gateway address string
    pub async fn create_network(&self, cidr: &str, gateway: &str) -> Result<Network> {
        let space = AddressSpace::parse(cidr, gateway)?;
        let network = self.store.create_network(space).await?;

        info!(
            network_id = network.id,
            cidr = %network.cidr,
            gateway = %network.gateway,
            "Created network"
        );
        Ok(network)
    }

    /// Get a network by ID
    pub async fn get_network(&self, id: i64) -> Result<Network> {
        self.store.get_network(id).await
    }

    /// List all networks
    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        self.store.list_networks().await
    }

    // ==================== Address Operations ====================

    /// Allocate an address in a network
    ///
    /// `requested` selects a specific address; `None` or a blank string asks
    /// for the lowest free address.
    pub async fn allocate_address(
        &self,
        network_id: i64,
        requested: Option<&str>,
        hostname: &str,
    ) -> Result<AddressRecord> {
        let requested_address = parse_requested(requested)?;
        let hostname = normalize_hostname(hostname)?;

        let request = AllocationRequest {
            network_id,
            requested_address,
            hostname,
        };

        match self.store.allocate(request).await {
            Ok(record) => {
                info!(
                    network_id,
                    address_id = record.id,
                    address = %record.address,
                    hostname = record.hostname.as_deref().unwrap_or_default(),
                    "Allocated address"
                );
                Ok(record)
            }
            Err(e) => {
                debug!(network_id, kind = %e.kind(), error = %e, "Allocation rejected");
                Err(e)
            }
        }
    }

    /// Release an address record
    pub async fn release_address(&self, id: i64) -> Result<()> {
        self.store.release(id).await?;
        info!(address_id = id, "Released address");
        Ok(())
    }

    /// Change the hostname bound to an allocated address
    pub async fn rename_address(&self, id: i64, hostname: &str) -> Result<()> {
        let hostname = normalize_hostname(hostname)?;
        self.store.update_hostname(id, &hostname).await?;
        info!(address_id = id, hostname = %hostname, "Renamed address");
        Ok(())
    }

    /// Get an address record by ID
    pub async fn get_address(&self, id: i64) -> Result<AddressRecord> {
        self.store.get_address(id).await
    }

    /// List address records of a network
    pub async fn list_addresses(&self, network_id: i64) -> Result<Vec<AddressRecord>> {
        self.store.list_addresses(network_id).await
    }
}

fn parse_requested(requested: Option<&str>) -> Result<Option<IpAddr>> {
    match requested.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidAddress(s.to_string())),
    }
}

fn normalize_hostname(hostname: &str) -> Result<String> {
    let hostname = hostname.trim();

    if hostname.is_empty() {
        return Err(Error::InvalidArgument("hostname must not be empty".to_string()));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(Error::InvalidArgument(format!(
            "hostname exceeds {} characters",
            MAX_HOSTNAME_LEN
        )));
    }
    if hostname.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidArgument(format!(
            "hostname {:?} contains whitespace or control characters",
            hostname
        )));
    }

    Ok(hostname.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::ErrorKind;

    fn manager() -> IpamManager {
        IpamManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_parse_requested() {
        assert_eq!(parse_requested(None).unwrap(), None);
        assert_eq!(parse_requested(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_requested(Some("10.0.0.7")).unwrap(),
            Some("10.0.0.7".parse().unwrap())
        );
        assert!(matches!(
            parse_requested(Some("10.0.0.300")),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("  web-01 ").unwrap(), "web-01");
        assert!(normalize_hostname("").is_err());
        assert!(normalize_hostname("   ").is_err());
        assert!(normalize_hostname("two words").is_err());
        assert!(normalize_hostname(&"a".repeat(MAX_HOSTNAME_LEN + 1)).is_err());
        assert!(normalize_hostname(&"a".repeat(MAX_HOSTNAME_LEN)).is_ok());
    }

    #[tokio::test]
    async fn test_create_network_validates() {
        let manager = manager();

        let err = manager.create_network("10.0.0.0/24", "10.1.0.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = manager.create_network("bogus", "10.0.0.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // nothing persisted by failed calls
        assert!(manager.list_networks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_hostname_rejected_before_store() {
        let manager = manager();
        let net = manager.create_network("10.0.0.0/30", "10.0.0.1").await.unwrap();

        let err = manager.allocate_address(net.id, None, " ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(manager.list_addresses(net.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hostname_trimmed_before_uniqueness() {
        let manager = manager();
        let net = manager.create_network("10.0.0.0/29", "10.0.0.1").await.unwrap();

        manager.allocate_address(net.id, None, "h1").await.unwrap();
        let err = manager
            .allocate_address(net.id, None, " h1 ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_unknown_network() {
        let manager = manager();
        let err = manager.allocate_address(99, None, "h").await.unwrap_err();
        assert!(matches!(err, Error::NetworkNotFound(99)));
    }
}
