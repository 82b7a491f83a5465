//! Candidate address iteration within a CIDR block
//!
//! The network (base) address and the gateway are never candidates. The last
//! address of the block is a candidate: pools here are plain ranges, not
//! broadcast domains.

use crate::{Error, Result};
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Numeric successor of `addr` within its own family
///
/// Wraps from the all-ones address back to the all-zeros address, carrying
/// across octets like ordinary address arithmetic.
pub fn next_address(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4).wrapping_add(1))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6).wrapping_add(1))),
    }
}

/// Check whether `addr` lies in `block`; always false across families
pub fn contains(block: &IpNet, addr: IpAddr) -> bool {
    block.contains(&addr)
}

/// A CIDR block together with its reserved gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    cidr: IpNet,
    gateway: IpAddr,
}

impl AddressSpace {
    /// Validate and build an address space
    ///
    /// The block must be in canonical form (no host bits set) and the gateway
    /// must lie inside it.
    pub fn new(cidr: IpNet, gateway: IpAddr) -> Result<Self> {
        if cidr.trunc() != cidr {
            return Err(Error::InvalidCidr(format!(
                "{} has host bits set (did you mean {}?)",
                cidr,
                cidr.trunc()
            )));
        }

        if !contains(&cidr, gateway) {
            return Err(Error::GatewayOutOfRange {
                gateway,
                cidr: cidr.to_string(),
            });
        }

        Ok(Self { cidr, gateway })
    }

    /// Parse a CIDR string and a gateway string, then validate
    pub fn parse(cidr: &str, gateway: &str) -> Result<Self> {
        let cidr = cidr.trim();
        let gateway = gateway.trim();

        let cidr: IpNet = cidr
            .parse()
            .map_err(|e| Error::InvalidCidr(format!("{:?}: {}", cidr, e)))?;
        let gateway: IpAddr = gateway
            .parse()
            .map_err(|e| Error::InvalidAddress(format!("gateway {:?}: {}", gateway, e)))?;
        Self::new(cidr, gateway)
    }

    /// Build from already-validated parts (rows read back from a store)
    pub(crate) fn from_parts(cidr: IpNet, gateway: IpAddr) -> Self {
        Self { cidr, gateway }
    }

    /// Get the CIDR block
    pub fn cidr(&self) -> IpNet {
        self.cidr
    }

    /// Get the gateway address
    pub fn gateway(&self) -> IpAddr {
        self.gateway
    }

    /// Base address of the block
    pub fn network_address(&self) -> IpAddr {
        self.cidr.network()
    }

    /// Highest address of the block
    pub fn last_address(&self) -> IpAddr {
        self.cidr.broadcast()
    }

    /// Check if an address is within this block
    pub fn contains(&self, addr: IpAddr) -> bool {
        contains(&self.cidr, addr)
    }

    /// Reject addresses that can never be handed out from this block
    pub fn check_allocatable(&self, addr: IpAddr) -> Result<()> {
        if !self.contains(addr) {
            return Err(Error::AddressOutOfRange {
                address: addr,
                cidr: self.cidr.to_string(),
            });
        }
        if addr == self.gateway {
            return Err(Error::GatewayNotAllocatable(addr));
        }
        if addr == self.network_address() {
            return Err(Error::NetworkAddressNotAllocatable(addr));
        }
        Ok(())
    }

    /// Allocatable candidates in strictly increasing order
    pub fn candidates(&self) -> Candidates {
        let network = self.network_address();
        let last = self.last_address();

        Candidates {
            next: (network != last).then(|| next_address(network)),
            last,
            gateway: self.gateway,
        }
    }
}

/// Lazy, restartable walk over the allocatable addresses of a block
#[derive(Debug, Clone)]
pub struct Candidates {
    next: Option<IpAddr>,
    last: IpAddr,
    gateway: IpAddr,
}

impl Iterator for Candidates {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        loop {
            let current = self.next?;
            self.next = (current != self.last).then(|| next_address(current));

            if current != self.gateway {
                return Some(current);
            }
        }
    }
}
