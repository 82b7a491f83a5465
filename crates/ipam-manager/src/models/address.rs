//! Address record model

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

/// Lifecycle state of an address record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    /// Released; the row is kept and may be reclaimed by a later allocation
    Available,
    /// Bound to a hostname
    Allocated,
}

impl AddressStatus {
    /// Persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Available => "available",
            AddressStatus::Allocated => "allocated",
        }
    }
}

impl std::fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "available" => Ok(AddressStatus::Available),
            "allocated" => Ok(AddressStatus::Allocated),
            other => Err(crate::Error::Database(format!(
                "unknown address status: {}",
                other
            ))),
        }
    }
}

/// A single address within a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: i64,
    pub network_id: i64,
    pub address: IpAddr,
    /// Cleared on release
    pub hostname: Option<String>,
    pub status: AddressStatus,
}

impl AddressRecord {
    /// Whether this record currently denotes an allocation
    pub fn is_allocated(&self) -> bool {
        self.status == AddressStatus::Allocated
    }
}

/// Validated input to [`crate::store::AllocationStore::allocate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub network_id: i64,
    /// Explicit target; first-available when `None`
    pub requested_address: Option<IpAddr>,
    pub hostname: String,
}

impl AllocationRequest {
    /// First-available allocation
    pub fn first_available(network_id: i64, hostname: impl Into<String>) -> Self {
        Self {
            network_id,
            requested_address: None,
            hostname: hostname.into(),
        }
    }

    /// Allocation of a specific address
    pub fn explicit(network_id: i64, address: IpAddr, hostname: impl Into<String>) -> Self {
        Self {
            network_id,
            requested_address: Some(address),
            hostname: hostname.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [AddressStatus::Available, AddressStatus::Allocated] {
            assert_eq!(status.as_str().parse::<AddressStatus>().unwrap(), status);
        }
        assert!("reserved".parse::<AddressStatus>().is_err());
    }

    #[test]
    fn test_record_json_shape() {
        let record = AddressRecord {
            id: 4,
            network_id: 1,
            address: "10.0.0.2".parse().unwrap(),
            hostname: None,
            status: AddressStatus::Available,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["address"], "10.0.0.2");
        assert_eq!(json["status"], "available");
        assert!(json["hostname"].is_null());
        assert!(!record.is_allocated());
    }
}
