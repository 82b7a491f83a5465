//! Data Transfer Objects for the REST API
//!
//! Request and response types for API endpoints. Request bodies reject
//! unknown fields; missing or ill-typed fields are reported as bad requests.

use crate::models::{AddressRecord, AddressStatus, Network};
use crate::ErrorKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// Network DTOs
// ============================================================================

/// Request to create a network
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNetworkDto {
    /// CIDR block, e.g. `10.0.0.0/24`
    pub cidr: String,
    /// Gateway address inside the block
    pub gateway: String,
}

/// Network response
#[derive(Debug, Clone, Serialize)]
pub struct NetworkResponse {
    pub id: i64,
    pub cidr: String,
    pub gateway: String,
}

impl From<Network> for NetworkResponse {
    fn from(network: Network) -> Self {
        Self {
            id: network.id,
            cidr: network.cidr.to_string(),
            gateway: network.gateway.to_string(),
        }
    }
}

// ============================================================================
// Address DTOs
// ============================================================================

/// Request to allocate an address
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocateAddressDto {
    pub network_id: i64,
    /// Specific address to allocate (optional - first available if absent)
    #[serde(default)]
    pub requested_ip: Option<String>,
    pub hostname: String,
}

/// Request to change the hostname of an address
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameAddressDto {
    pub hostname: String,
}

/// Address record response
#[derive(Debug, Clone, Serialize)]
pub struct AddressResponse {
    pub id: i64,
    pub network_id: i64,
    pub address: String,
    pub hostname: Option<String>,
    pub status: AddressStatus,
}

impl From<AddressRecord> for AddressResponse {
    fn from(record: AddressRecord) -> Self {
        Self {
            id: record.id,
            network_id: record.network_id,
            address: record.address.to_string(),
            hostname: record.hostname,
            status: record.status,
        }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// API error response
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::new("EXHAUSTED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Error body for a taxonomy kind
    pub fn for_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ErrorKind::Validation => Self::bad_request(message),
            ErrorKind::NotFound => Self::not_found(message),
            ErrorKind::Conflict => Self::conflict(message),
            ErrorKind::Exhausted => Self::exhausted(message),
            ErrorKind::Storage => Self::internal(message),
        }
    }
}
