use deadpool_postgres::{Config, Pool, Runtime};
use evrec_types::config::DrConfig;
use tokio_postgres::NoTls;
use tracing::info;

use crate::{DrError, Result};

/// Construct the bounded connection pool once at startup, shared by `Arc`
/// thereafter.
pub fn build_pool(config: &DrConfig) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size));

    info!(host = %config.host, pool_size = config.pool_size, "building DR connection pool");
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| DrError::Connection(e.to_string()))
}
