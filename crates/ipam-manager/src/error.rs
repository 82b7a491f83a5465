//! Error types for address management

use std::net::IpAddr;
use thiserror::Error;

/// Result type for IPAM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every [`Error`] variant.
///
/// Callers (the HTTP layer in particular) branch on the kind rather than on
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, detected before any write
    Validation,
    /// Referenced network or address record does not exist
    NotFound,
    /// Hostname or address already taken
    Conflict,
    /// No free address remains in the pool
    Exhausted,
    /// Underlying persistence failure
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Exhausted => write!(f, "exhausted"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// IPAM errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Validation errors
    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Gateway {gateway} is not within network {cidr}")]
    GatewayOutOfRange { gateway: IpAddr, cidr: String },

    #[error("Cannot allocate gateway address {0}")]
    GatewayNotAllocatable(IpAddr),

    #[error("Cannot allocate network address {0}")]
    NetworkAddressNotAllocatable(IpAddr),

    #[error("IP {address} is not in network {cidr}")]
    AddressOutOfRange { address: IpAddr, cidr: String },

    #[error("Address record {0} is not allocated")]
    AddressNotAllocated(i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Lookup errors
    #[error("Network not found: {0}")]
    NetworkNotFound(i64),

    #[error("IP address not found: {0}")]
    AddressNotFound(i64),

    // Conflicts
    #[error("Hostname {hostname} is already in use in network {network_id}")]
    HostnameInUse { hostname: String, network_id: i64 },

    #[error("IP address {0} is already allocated")]
    AddressAlreadyAllocated(IpAddr),

    // Exhaustion
    #[error("No available IP addresses in network {0}")]
    NoAvailableAddresses(i64),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),
}

impl Error {
    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCidr(_)
            | Error::InvalidAddress(_)
            | Error::GatewayOutOfRange { .. }
            | Error::GatewayNotAllocatable(_)
            | Error::NetworkAddressNotAllocatable(_)
            | Error::AddressOutOfRange { .. }
            | Error::AddressNotAllocated(_)
            | Error::InvalidArgument(_) => ErrorKind::Validation,
            Error::NetworkNotFound(_) | Error::AddressNotFound(_) => ErrorKind::NotFound,
            Error::HostnameInUse { .. } | Error::AddressAlreadyAllocated(_) => {
                ErrorKind::Conflict
            }
            Error::NoAvailableAddresses(_) => ErrorKind::Exhausted,
            Error::Database(_) => ErrorKind::Storage,
        }
    }
}

impl From<ipnet::AddrParseError> for Error {
    fn from(e: ipnet::AddrParseError) -> Self {
        Error::InvalidCidr(e.to_string())
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Error::InvalidAddress(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Error::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_kind_classification() {
        let gw = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(Error::GatewayNotAllocatable(gw).kind(), ErrorKind::Validation);
        assert_eq!(Error::NetworkNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::HostnameInUse {
                hostname: "h1".into(),
                network_id: 1
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(Error::AddressAlreadyAllocated(gw).kind(), ErrorKind::Conflict);
        assert_eq!(Error::NoAvailableAddresses(1).kind(), ErrorKind::Exhausted);
        assert_eq!(Error::Database("gone".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_parse_errors_are_validation() {
        let err: Error = "10.0.0.0/33".parse::<ipnet::IpNet>().unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: Error = "not-an-ip".parse::<IpAddr>().unwrap_err().into();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[test]
    fn test_messages() {
        let err = Error::NoAvailableAddresses(3);
        assert_eq!(err.to_string(), "No available IP addresses in network 3");

        let err = Error::AddressAlreadyAllocated("10.0.0.2".parse().unwrap());
        assert!(err.to_string().contains("already allocated"));
    }
}
