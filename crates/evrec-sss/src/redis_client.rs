use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, error, info};

use crate::{Result, SharedStateStore, SssError};

/// Redis-backed Shared State Store.
///
/// Construction mirrors `RedisCheckpointer::new` / `with_key_prefix`: open a
/// client, build a `ConnectionManager` (auto-reconnecting, cheap to clone),
/// and keep a key prefix so every caller's keys are namespaced.
pub struct RedisSss {
    connection_manager: ConnectionManager,
    key_prefix: String,
}

impl RedisSss {
    pub async fn connect(connection_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        info!(url = %connection_url, "connecting to SSS (redis)");
        let client = redis::Client::open(connection_url).map_err(|e| {
            error!(error = %e, "failed to build SSS client");
            SssError::Connection(e.to_string())
        })?;
        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!(error = %e, "failed to connect to SSS");
            SssError::Connection(e.to_string())
        })?;
        Ok(Self { connection_manager, key_prefix: key_prefix.into() })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl SharedStateStore for RedisSss {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let raw: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(raw)
    }

    async fn set_raw(&self, key: &str, value: String, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let full_key = self.namespaced(key);
        match ttl_secs {
            Some(ttl) if ttl > 0 => {
                let _: () = conn.set_ex(full_key, value, ttl).await?;
            }
            _ => {
                let _: () = conn.set(full_key, value).await?;
            }
        }
        debug!(key, "wrote SSS entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.zadd(self.namespaced(key), member, score).await?;
        Ok(())
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let mut conn = self.connection_manager.clone();
        let score: Option<f64> = conn.zscore(self.namespaced(key), member).await?;
        Ok(score)
    }

    async fn zrevrange(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let mut conn = self.connection_manager.clone();
        let items: Vec<(String, f64)> = conn
            .zrevrange_withscores(self.namespaced(key), 0, limit.saturating_sub(1) as isize)
            .await?;
        Ok(items)
    }

    async fn acquire_lock(&self, resource: &str, ttl_ms: u64, token: &str) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let key = crate::Keys::lock(resource);
        let result: Option<String> = redis::cmd("SET")
            .arg(self.namespaced(&key))
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    async fn release_lock(&self, resource: &str, token: &str) -> Result<()> {
        // Only release if we still hold the lock, implemented as a
        // read-check-delete rather than a Lua script
        // to keep this crate's Redis surface small; the race (lock expires
        // between the GET and DEL) only risks an early unlock, never a
        // double-lock, since PX already bounds staleness.
        let mut conn = self.connection_manager.clone();
        let key = crate::Keys::lock(resource);
        let full_key = self.namespaced(&key);
        let current: Option<String> = conn.get(&full_key).await?;
        if current.as_deref() == Some(token) {
            let _: () = conn.del(&full_key).await?;
        }
        Ok(())
    }
}
