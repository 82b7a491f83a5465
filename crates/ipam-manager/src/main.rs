use ipam_manager::{start_server, AllocationStore, AppState, Config, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let store = open_store(&config).await?;
    info!("Using {} allocation store", store.backend());

    let state = Arc::new(AppState::with_store(store));
    start_server(state, &config.server).await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn AllocationStore>> {
    use ipam_manager::PgStore;

    if config.database.url.is_none() {
        warn!("DATABASE_URL not set, allocations will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Connecting to database...");
    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn AllocationStore>> {
    if config.database.url.is_some() {
        warn!("DATABASE_URL is set but this build has no postgres support, ignoring it");
    }
    Ok(Arc::new(MemoryStore::new()))
}
