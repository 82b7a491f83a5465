//! Network (address pool) model

use crate::allocator::AddressSpace;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// An address pool: a CIDR block with a reserved gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Store-assigned identifier
    pub id: i64,
    /// CIDR block (canonical, host bits cleared)
    pub cidr: IpNet,
    /// Gateway address, always inside `cidr` and never allocatable
    pub gateway: IpAddr,
}

impl Network {
    /// Candidate iteration and membership checks for this pool
    pub fn address_space(&self) -> AddressSpace {
        AddressSpace::from_parts(self.cidr, self.gateway)
    }

    /// Check if an address is within this network's block
    pub fn contains(&self, addr: IpAddr) -> bool {
        crate::allocator::contains(&self.cidr, addr)
    }
}
