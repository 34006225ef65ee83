//! Typed access to the local store
//!
//! Cached JSON that fails to parse is logged and treated as absent: a corrupt
//! entry must never block startup, and the next pull rewrites it.

use chrono::{DateTime, Utc};
use loyalty_core::{Account, LocalStore, Order, Prize, RepoResult, Settings, Snapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::keys;

/// Persisted sign-in state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

/// Snapshot, session and sync-stamp persistence over any [`LocalStore`]
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Read and decode a key; missing or unreadable JSON yields `None`
    async fn read<T: DeserializeOwned>(&self, key: &str) -> RepoResult<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> RepoResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| loyalty_core::DomainError::CacheError(e.to_string()))?;
        self.store.set(key, &raw).await
    }

    /// Load the cached snapshot; each collection falls back to empty on its own
    pub async fn load_snapshot(&self) -> RepoResult<Snapshot> {
        Ok(Snapshot {
            accounts: self.read::<Vec<Account>>(keys::ACCOUNTS).await?.unwrap_or_default(),
            guest_orders: self.read::<Vec<Order>>(keys::GUEST_ORDERS).await?.unwrap_or_default(),
            settings: self.read::<Settings>(keys::SETTINGS).await?,
            prize_catalog: self.read::<Vec<Prize>>(keys::PRIZE_CATALOG).await?.unwrap_or_default(),
        })
    }

    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> RepoResult<()> {
        self.write(keys::ACCOUNTS, &snapshot.accounts).await?;
        self.write(keys::GUEST_ORDERS, &snapshot.guest_orders).await?;
        match &snapshot.settings {
            Some(settings) => self.write(keys::SETTINGS, settings).await?,
            None => self.store.delete(keys::SETTINGS).await?,
        }
        self.write(keys::PRIZE_CATALOG, &snapshot.prize_catalog).await?;

        tracing::debug!(
            accounts = snapshot.accounts.len(),
            guest_orders = snapshot.guest_orders.len(),
            "Local snapshot saved"
        );
        Ok(())
    }

    /// Time of the last successful pull or push
    pub async fn last_sync(&self) -> RepoResult<Option<DateTime<Utc>>> {
        self.read(keys::LAST_SYNC).await
    }

    pub async fn mark_synced(&self, at: DateTime<Utc>) -> RepoResult<()> {
        self.write(keys::LAST_SYNC, &at).await
    }

    pub async fn load_session(&self) -> RepoResult<Option<SessionRecord>> {
        self.read(keys::SESSION).await
    }

    /// Persist the session, or remove it when signed out
    pub async fn save_session(&self, session: Option<&SessionRecord>) -> RepoResult<()> {
        match session {
            Some(record) => self.write(keys::SESSION, record).await,
            None => self.store.delete(keys::SESSION).await,
        }
    }

    /// Wipe everything this device has cached
    pub async fn clear(&self) -> RepoResult<()> {
        self.store.clear().await
    }
}
