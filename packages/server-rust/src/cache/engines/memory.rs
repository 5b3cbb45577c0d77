//! In-memory [`ConfigStore`] backed by [`DashMap`].
//!
//! Suitable for single-process deployments and tests. Store-if-absent goes
//! through the entry API, which holds the shard lock for the key.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::store::ConfigStore;

/// In-memory layergroup store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: DashMap<String, String>,
}

impl MemoryConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn set_if_absent(&self, key: &str, value: String) -> anyhow::Result<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_keeps_first_value() {
        let store = MemoryConfigStore::new();
        assert!(store.set_if_absent("k", "first".to_string()).await.unwrap());
        assert!(!store.set_if_absent("k", "second".to_string()).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryConfigStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
        assert!(!store.exists("missing").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryConfigStore::new();
        store.set_if_absent("k", "v".to_string()).await.unwrap();
        assert!(store.exists("k").await.unwrap());
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }
}
