//! Data models for address management

mod address;
mod network;

pub use address::{AddressRecord, AddressStatus, AllocationRequest};
pub use network::Network;
