use crate::cache::{CacheEntry, CacheStore};
use crate::error::CacheError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// In-process TTL store. Expired entries read as misses and are dropped on
/// the next write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, deadline)| *deadline > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Value>, CacheError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(key)
                    .filter(|(_, deadline)| *deadline > now)
                    .map(|(value, _)| (key.clone(), value.clone()))
            })
            .collect())
    }

    async fn set_many(&self, batch: Vec<CacheEntry>) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, deadline)| *deadline > now);
        for entry in batch {
            entries.insert(entry.key, (entry.value, now + entry.ttl));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache
            .set("a", json!({"x": 1}), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let cache = MemoryCache::new();
        cache
            .set_many(vec![
                CacheEntry {
                    key: "a".into(),
                    value: json!(1),
                    ttl: Duration::from_secs(60),
                },
                CacheEntry {
                    key: "b".into(),
                    value: json!(2),
                    ttl: Duration::from_secs(60),
                },
            ])
            .await
            .unwrap();

        let found = cache
            .get_many(&["a".to_string(), "c".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["b"], json!(2));
        assert!(!found.contains_key("c"));
    }
}
