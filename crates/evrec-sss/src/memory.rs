//! In-memory fake used by unit tests across the workspace, a hand-written
//! stand-in for the Redis-backed implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::{Result, SharedStateStore};

pub struct MemorySss {
    values: DashMap<String, String>,
    zsets: DashMap<String, Mutex<BTreeMap<String, f64>>>,
    locks: DashMap<String, String>,
}

impl Default for MemorySss {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySss {
    pub fn new() -> Self {
        Self { values: DashMap::new(), zsets: DashMap::new(), locks: DashMap::new() }
    }
}

#[async_trait]
impl SharedStateStore for MemorySss {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).map(|raw| raw.clone()))
    }

    async fn set_raw(&self, key: &str, value: String, _ttl_secs: Option<u64>) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let set = self.zsets.entry(key.to_string()).or_insert_with(|| Mutex::new(BTreeMap::new()));
        set.lock().insert(member.to_string(), score);
        Ok(())
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self.zsets.get(key).and_then(|set| set.lock().get(member).copied()))
    }

    async fn zrevrange(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let Some(set) = self.zsets.get(key) else { return Ok(Vec::new()) };
        let mut items: Vec<(String, f64)> = set.lock().iter().map(|(k, v)| (k.clone(), *v)).collect();
        items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        items.truncate(limit);
        Ok(items)
    }

    async fn acquire_lock(&self, resource: &str, _ttl_ms: u64, token: &str) -> Result<bool> {
        use dashmap::mapref::entry::Entry;
        match self.locks.entry(resource.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(e) => {
                e.insert(token.to_string());
                Ok(true)
            }
        }
    }

    async fn release_lock(&self, resource: &str, token: &str) -> Result<()> {
        if let Some(held) = self.locks.get(resource) {
            if *held == token {
                drop(held);
                self.locks.remove(resource);
            }
        }
        Ok(())
    }
}
