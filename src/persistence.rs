use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StorageError;
use crate::persistence_iface::KeyValueStore;

/// In-memory key-value store.
///
/// The default backend for tests and hosts without a durable store; a
/// real deployment injects its own [`KeyValueStore`] implementation.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of stored entries, mainly useful in tests.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.len().await, 1);

        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_absent_key_is_a_no_op() {
        let store = InMemoryKeyValueStore::new();
        store.delete("missing").await.unwrap();
        assert!(store.is_empty().await);
    }
}
