//! REST API handlers
//!
//! Implements handlers for network and address endpoints.

use super::dto::*;
use super::state::AppState;
use crate::{Error, ErrorKind};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ApiError>)>;

/// Convert internal error to API response
fn error_response(err: Error) -> (StatusCode, Json<ApiError>) {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::Exhausted => StatusCode::CONFLICT,
        ErrorKind::Storage => {
            tracing::error!(error = %err, "Storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = ApiError::for_kind(kind, err.to_string())
        .with_details(json!({ "kind": kind.to_string() }));
    (status, Json(body))
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(rejection.body_text())),
        )
    })
}

fn path_id(path: std::result::Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id).map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(rejection.body_text())),
        )
    })
}

// ============================================================================
// Network Handlers
// ============================================================================

/// Create a network
pub async fn create_network(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateNetworkDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NetworkResponse>)> {
    let req = json_body(body)?;

    let network = state
        .manager
        .create_network(&req.cidr, &req.gateway)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(network.into())))
}

/// List all networks
pub async fn list_networks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<NetworkResponse>>> {
    let networks = state
        .manager
        .list_networks()
        .await
        .map_err(error_response)?;

    Ok(Json(networks.into_iter().map(Into::into).collect()))
}

/// Get a single network
pub async fn get_network(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<NetworkResponse>> {
    let id = path_id(id)?;
    let network = state
        .manager
        .get_network(id)
        .await
        .map_err(error_response)?;

    Ok(Json(network.into()))
}

/// List address records of a network
pub async fn list_network_addresses(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<AddressResponse>>> {
    let id = path_id(id)?;
    let records = state
        .manager
        .list_addresses(id)
        .await
        .map_err(error_response)?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Address Handlers
// ============================================================================

/// Allocate an address
pub async fn allocate_address(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<AllocateAddressDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AddressResponse>)> {
    let req = json_body(body)?;

    let record = state
        .manager
        .allocate_address(req.network_id, req.requested_ip.as_deref(), &req.hostname)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Get a single address record
pub async fn get_address(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AddressResponse>> {
    let id = path_id(id)?;
    let record = state
        .manager
        .get_address(id)
        .await
        .map_err(error_response)?;

    Ok(Json(record.into()))
}

/// Release an address
pub async fn release_address(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = path_id(id)?;
    state
        .manager
        .release_address(id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Change the hostname of an address
pub async fn rename_address(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
    body: std::result::Result<Json<RenameAddressDto>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = path_id(id)?;
    let req = json_body(body)?;

    state
        .manager
        .rename_address(id, &req.hostname)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, body) = error_response(Error::NetworkNotFound(5));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");

        assert_eq!(body.details, Some(json!({ "kind": "not_found" })));

        let (status, body) = error_response(Error::NoAvailableAddresses(5));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "EXHAUSTED");
        assert_eq!(body.details, Some(json!({ "kind": "exhausted" })));

        let (status, _) = error_response(Error::GatewayNotAllocatable("10.0.0.1".parse().unwrap()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(Error::Database("down".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
