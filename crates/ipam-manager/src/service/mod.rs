//! Allocation engine
//!
//! Validates caller input, then delegates to the store. Holds no state of
//! its own.

mod manager;

pub use manager::{IpamManager, MAX_HOSTNAME_LEN};
