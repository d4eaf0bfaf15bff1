//! Shared State Store adapter: string keys with TTL, sorted sets keyed by
//! score, and advisory locks, on top of Redis.

mod error;
pub mod memory;
mod redis_client;

pub use error::SssError;
pub use redis_client::RedisSss;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub type Result<T> = std::result::Result<T, SssError>;

/// Shared state store key layout, centralized so every caller builds keys
/// the same way.
pub struct Keys;

impl Keys {
    pub fn features(station_id: &str) -> String {
        format!("station:features:{station_id}")
    }
    pub fn score(station_id: &str) -> String {
        format!("station:score:{station_id}")
    }
    pub fn telemetry(station_id: &str) -> String {
        format!("station:telemetry:{station_id}")
    }
    pub fn health(station_id: &str) -> String {
        format!("station:health:{station_id}")
    }
    pub fn grid_status(grid_id: &str) -> String {
        format!("grid:status:{grid_id}")
    }
    pub fn prediction(kind: &str, station_id: &str) -> String {
        format!("prediction:{kind}:{station_id}")
    }
    pub fn user_context(user_id: &str) -> String {
        format!("user:context:{user_id}")
    }
    pub fn user_session(session_id: &str) -> String {
        format!("user:session:{session_id}")
    }
    pub fn recommendation(request_id: &str) -> String {
        format!("recommendation:{request_id}")
    }
    pub fn metrics_counter(name: &str) -> String {
        format!("metrics:counter:{name}")
    }
    pub fn lock(resource: &str) -> String {
        format!("lock:{resource}")
    }
    pub const RANKING: &'static str = "ranking:stations";
}

/// Every full-record write is a replace, never a mid-record mutation, so
/// the trait only exposes whole-value get/set plus the sorted-set and
/// lock primitives.
///
/// The raw methods trade in JSON-encoded strings rather than a generic `T`
/// so the trait stays object-safe: every production call site holds an
/// `Arc<dyn SharedStateStore>`, and a generic method would rule that out.
/// [`SharedStateStoreExt`] layers the typed `get_json`/`set_json` callers
/// actually use back on top via a blanket impl.
#[async_trait]
pub trait SharedStateStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: String, ttl_secs: Option<u64>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// `ZADD key score member`, replacing any prior score for `member`
    /// (last-writer-wins).
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>>;
    /// Highest-scoring members first, `limit` entries.
    async fn zrevrange(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>>;

    /// `SET key value NX PX ttl_ms`; returns `true` if the lock was
    /// acquired.
    async fn acquire_lock(&self, resource: &str, ttl_ms: u64, token: &str) -> Result<bool>;
    async fn release_lock(&self, resource: &str, token: &str) -> Result<()>;
}

/// Typed JSON helpers over [`SharedStateStore`], blanket-implemented for
/// every store (concrete or `dyn`) so callers never hand-roll
/// encode/decode around `get_raw`/`set_raw`.
#[async_trait]
pub trait SharedStateStoreExt: SharedStateStore {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl_secs).await
    }
}

impl<T: SharedStateStore + ?Sized> SharedStateStoreExt for T {}
