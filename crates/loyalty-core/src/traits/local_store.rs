//! Device-local key-value persistence

use async_trait::async_trait;

use super::RepoResult;

/// String-keyed store for the local snapshot, session and sync stamps
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a raw value
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    /// Write a raw value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> RepoResult<()>;

    /// Remove a key; missing keys are not an error
    async fn delete(&self, key: &str) -> RepoResult<()>;

    /// Remove every key this store owns
    async fn clear(&self) -> RepoResult<()>;
}
