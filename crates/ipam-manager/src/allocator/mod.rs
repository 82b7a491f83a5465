//! Address-space model
//!
//! Enumerates allocatable candidates of a CIDR block in ascending order and
//! answers membership questions. Holds no state about which addresses are
//! taken; occupancy lives in the store.

mod address_space;

pub use address_space::{contains, next_address, AddressSpace, Candidates};
