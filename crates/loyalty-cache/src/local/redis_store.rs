//! Redis-backed local store

use async_trait::async_trait;
use loyalty_core::{LocalStore, RepoResult};

use super::keys;
use crate::pool::RedisPool;

const SCAN_BATCH: usize = 100;

/// `LocalStore` over a Redis instance private to one device or process group
#[derive(Debug, Clone)]
pub struct RedisLocalStore {
    pool: RedisPool,
}

impl RedisLocalStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalStore for RedisLocalStore {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.pool.get_raw(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        Ok(self.pool.set_raw(key, value).await?)
    }

    async fn delete(&self, key: &str) -> RepoResult<()> {
        self.pool.delete(key).await?;
        Ok(())
    }

    async fn clear(&self) -> RepoResult<()> {
        let owned = self
            .pool
            .scan_keys(&format!("{}*", keys::PREFIX), SCAN_BATCH)
            .await?;
        let removed = self.pool.delete_many(&owned).await?;
        tracing::info!(removed, "Local cache cleared");
        Ok(())
    }
}
