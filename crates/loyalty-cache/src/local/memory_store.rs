//! In-process local store

use async_trait::async_trait;
use loyalty_core::{LocalStore, RepoResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// `LocalStore` held in memory; used by tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> RepoResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> RepoResult<()> {
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryLocalStore::new();
        store.set("loyalty:session", "{}").await.unwrap();
        assert_eq!(store.get("loyalty:session").await.unwrap().as_deref(), Some("{}"));

        store.delete("loyalty:session").await.unwrap();
        assert!(store.get("loyalty:session").await.unwrap().is_none());
        store.delete("loyalty:session").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryLocalStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
