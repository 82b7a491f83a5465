//! PostgreSQL allocation store
//!
//! Each mutating call runs in its own transaction. Address exclusivity rests
//! on `UNIQUE (network_id, address)` and the claim statement below, which
//! inserts a fresh row or reclaims a released one in a single conditional
//! write. Hostname exclusivity rests on a partial unique index over allocated
//! rows, so a concurrent duplicate surfaces as a conflict at write time.

use super::AllocationStore;
use crate::allocator::AddressSpace;
use crate::config::DatabaseConfig;
use crate::models::{AddressRecord, AddressStatus, AllocationRequest, Network};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

const HOSTNAME_INDEX: &str = "ip_addresses_network_hostname_allocated_idx";

const NETWORK_COLUMNS: &str = "id, cidr::text AS cidr, host(gateway) AS gateway";

const ADDRESS_COLUMNS: &str =
    "id, network_id, host(address) AS address, hostname, status";

/// Insert a new allocated row, or flip a released row back to allocated.
/// Returns no row when the address is currently allocated.
const CLAIM_ADDRESS: &str = r#"
    INSERT INTO ip_addresses (network_id, address, hostname, status)
    VALUES ($1, $2::inet, $3, 'allocated')
    ON CONFLICT (network_id, address) DO UPDATE
        SET hostname = EXCLUDED.hostname, status = 'allocated'
        WHERE ip_addresses.status = 'available'
    RETURNING id, network_id, host(address) AS address, hostname, status
"#;

#[derive(Debug, FromRow)]
struct NetworkRow {
    id: i64,
    cidr: String,
    gateway: String,
}

impl TryFrom<NetworkRow> for Network {
    type Error = Error;

    fn try_from(row: NetworkRow) -> Result<Self> {
        Ok(Network {
            id: row.id,
            cidr: row
                .cidr
                .parse()
                .map_err(|e| Error::Database(format!("stored cidr {}: {}", row.cidr, e)))?,
            gateway: parse_stored_addr(&row.gateway)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct AddressRow {
    id: i64,
    network_id: i64,
    address: String,
    hostname: Option<String>,
    status: String,
}

impl TryFrom<AddressRow> for AddressRecord {
    type Error = Error;

    fn try_from(row: AddressRow) -> Result<Self> {
        Ok(AddressRecord {
            id: row.id,
            network_id: row.network_id,
            address: parse_stored_addr(&row.address)?,
            hostname: row.hostname,
            status: row.status.parse::<AddressStatus>()?,
        })
    }
}

fn parse_stored_addr(s: &str) -> Result<IpAddr> {
    s.parse()
        .map_err(|e| Error::Database(format!("stored address {}: {}", s, e)))
}

/// Translate a unique violation on the hostname index into a conflict
fn map_write_error(e: sqlx::Error, hostname: &str, network_id: i64) -> Error {
    match &e {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() && db_err.constraint() == Some(HOSTNAME_INDEX) =>
        {
            Error::HostnameInUse {
                hostname: hostname.to_string(),
                network_id,
            }
        }
        _ => Error::from(e),
    }
}

/// Allocation store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Database("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn network_in(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<Network> {
        let row = sqlx::query_as::<_, NetworkRow>(&format!(
            "SELECT {} FROM networks WHERE id = $1 FOR SHARE",
            NETWORK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::NetworkNotFound(id))?;

        row.try_into()
    }

    async fn hostname_taken(
        tx: &mut Transaction<'_, Postgres>,
        network_id: i64,
        hostname: &str,
        except_id: Option<i64>,
    ) -> Result<bool> {
        let holder: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM ip_addresses
            WHERE network_id = $1 AND hostname = $2 AND status = 'allocated'
              AND ($3::bigint IS NULL OR id <> $3)
            LIMIT 1
            "#,
        )
        .bind(network_id)
        .bind(hostname)
        .bind(except_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(holder.is_some())
    }

    async fn claim(
        tx: &mut Transaction<'_, Postgres>,
        network_id: i64,
        addr: IpAddr,
        hostname: &str,
    ) -> Result<Option<AddressRecord>> {
        let row = sqlx::query_as::<_, AddressRow>(CLAIM_ADDRESS)
            .bind(network_id)
            .bind(addr.to_string())
            .bind(hostname)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_write_error(e, hostname, network_id))?;

        row.map(AddressRecord::try_from).transpose()
    }

    async fn allocated_set(
        tx: &mut Transaction<'_, Postgres>,
        network_id: i64,
    ) -> Result<HashSet<IpAddr>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT host(address) FROM ip_addresses WHERE network_id = $1 AND status = 'allocated'",
        )
        .bind(network_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(|s| parse_stored_addr(s)).collect()
    }
}

#[async_trait]
impl AllocationStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[tracing::instrument(skip(self))]
    async fn create_network(&self, space: AddressSpace) -> Result<Network> {
        let row = sqlx::query_as::<_, NetworkRow>(&format!(
            "INSERT INTO networks (cidr, gateway) VALUES ($1::cidr, $2::inet) RETURNING {}",
            NETWORK_COLUMNS
        ))
        .bind(space.cidr().to_string())
        .bind(space.gateway().to_string())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn get_network(&self, id: i64) -> Result<Network> {
        sqlx::query_as::<_, NetworkRow>(&format!(
            "SELECT {} FROM networks WHERE id = $1",
            NETWORK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NetworkNotFound(id))?
        .try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn list_networks(&self) -> Result<Vec<Network>> {
        sqlx::query_as::<_, NetworkRow>(&format!(
            "SELECT {} FROM networks ORDER BY id",
            NETWORK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Network::try_from)
        .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn allocate(&self, request: AllocationRequest) -> Result<AddressRecord> {
        let mut tx = self.pool.begin().await?;

        let space = Self::network_in(&mut tx, request.network_id)
            .await?
            .address_space();
        if let Some(addr) = request.requested_address {
            space.check_allocatable(addr)?;
        }

        if Self::hostname_taken(&mut tx, request.network_id, &request.hostname, None).await? {
            return Err(Error::HostnameInUse {
                hostname: request.hostname,
                network_id: request.network_id,
            });
        }

        let record = match request.requested_address {
            Some(addr) => {
                let existing: Option<String> = sqlx::query_scalar(
                    r#"
                    SELECT status FROM ip_addresses
                    WHERE network_id = $1 AND address = $2::inet
                    FOR UPDATE
                    "#,
                )
                .bind(request.network_id)
                .bind(addr.to_string())
                .fetch_optional(&mut *tx)
                .await?;

                if existing.as_deref() == Some(AddressStatus::Allocated.as_str()) {
                    return Err(Error::AddressAlreadyAllocated(addr));
                }

                Self::claim(&mut tx, request.network_id, addr, &request.hostname)
                    .await?
                    .ok_or(Error::AddressAlreadyAllocated(addr))?
            }
            None => {
                let occupied = Self::allocated_set(&mut tx, request.network_id).await?;
                let mut claimed = None;

                for candidate in space.candidates().filter(|a| !occupied.contains(a)) {
                    if let Some(record) =
                        Self::claim(&mut tx, request.network_id, candidate, &request.hostname)
                            .await?
                    {
                        claimed = Some(record);
                        break;
                    }
                    debug!(address = %candidate, "candidate claimed concurrently, trying next");
                }

                claimed.ok_or(Error::NoAvailableAddresses(request.network_id))?
            }
        };

        tx.commit().await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE ip_addresses SET status = 'available', hostname = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AddressNotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_hostname(&self, id: i64, hostname: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT network_id, status FROM ip_addresses WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (network_id, status) = row.ok_or(Error::AddressNotFound(id))?;

        Self::network_in(&mut tx, network_id).await?;

        if status != AddressStatus::Allocated.as_str() {
            return Err(Error::AddressNotAllocated(id));
        }

        if Self::hostname_taken(&mut tx, network_id, hostname, Some(id)).await? {
            return Err(Error::HostnameInUse {
                hostname: hostname.to_string(),
                network_id,
            });
        }

        sqlx::query("UPDATE ip_addresses SET hostname = $1 WHERE id = $2")
            .bind(hostname)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, hostname, network_id))?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_address(&self, id: i64) -> Result<AddressRecord> {
        sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {} FROM ip_addresses WHERE id = $1",
            ADDRESS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::AddressNotFound(id))?
        .try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn list_addresses(&self, network_id: i64) -> Result<Vec<AddressRecord>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM networks WHERE id = $1")
            .bind(network_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NetworkNotFound(network_id));
        }

        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {} FROM ip_addresses WHERE network_id = $1 ORDER BY id",
            ADDRESS_COLUMNS
        ))
        .bind(network_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.into_iter().map(AddressRecord::try_from).collect()
    }
}
