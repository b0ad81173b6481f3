//! Key/value cache seam.
//!
//! The physical store lives behind [`CacheStore`]. Components talk to it
//! through [`JsonCache`], which encodes values as JSON and turns every store
//! or decode failure into a logged miss.

pub mod keys;
mod memory;

pub use memory::MemoryCache;

use crate::error::CacheError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub ttl: Duration,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Present keys only; missing or expired keys are absent from the map.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Value>, CacheError>;

    async fn set_many(&self, entries: Vec<CacheEntry>) -> Result<(), CacheError>;
}

/// Typed view over a shared [`CacheStore`].
#[derive(Clone)]
pub struct JsonCache {
    store: Arc<dyn CacheStore>,
}

impl JsonCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                decode(key, value)
            }
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key, "cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "cache encode failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, value, ttl).await {
            warn!(key, "cache write failed: {}", e);
        }
    }

    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> HashMap<String, T> {
        if keys.is_empty() {
            return HashMap::new();
        }
        match self.store.get_many(keys).await {
            Ok(values) => {
                debug!(requested = keys.len(), hits = values.len(), "cache batch read");
                values
                    .into_iter()
                    .filter_map(|(key, value)| decode(&key, value).map(|value| (key, value)))
                    .collect()
            }
            Err(e) => {
                warn!("cache batch read failed, treating as miss: {}", e);
                HashMap::new()
            }
        }
    }

    pub async fn set_many<T: Serialize>(&self, entries: Vec<(String, T)>, ttl: Duration) {
        if entries.is_empty() {
            return;
        }
        let entries = entries
            .into_iter()
            .filter_map(|(key, value)| match serde_json::to_value(&value) {
                Ok(value) => Some(CacheEntry { key, value, ttl }),
                Err(e) => {
                    warn!(key, "cache encode failed: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();
        if let Err(e) = self.store.set_many(entries).await {
            warn!("cache batch write failed: {}", e);
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "cached value could not be decoded, treating as miss: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }

        async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }

        async fn get_many(&self, _keys: &[String]) -> Result<HashMap<String, Value>, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }

        async fn set_many(&self, _entries: Vec<CacheEntry>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_reads_as_miss() {
        let cache = JsonCache::new(Arc::new(BrokenStore));
        cache.set("k", &42u32, Duration::from_secs(60)).await;

        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(cache.get_many::<u32>(&["k".to_string()]).await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_value_reads_as_miss() {
        let store = Arc::new(MemoryCache::new());
        store
            .set("k", Value::String("not a number".into()), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = JsonCache::new(store);

        assert_eq!(cache.get::<u32>("k").await, None);
    }
}
