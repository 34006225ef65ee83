//! Test helpers for integration tests
//!
//! A [`TestDevice`] is one client: its own local store and service context
//! over a remote store that several devices can share.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use loyalty_cache::MemoryLocalStore;
use loyalty_common::SyncConfig;
use loyalty_core::{Account, AccountRecord, RemoteSnapshot, Snapshot};
use loyalty_db::MemoryRemoteStore;
use loyalty_service::{PullOptions, ServiceContext, ServiceContextBuilder, Session};

/// Shared remote store
pub fn remote_store() -> Arc<MemoryRemoteStore> {
    Arc::new(MemoryRemoteStore::default())
}

/// Remote store holding the given active accounts
pub fn remote_with(accounts: Vec<Account>) -> Arc<MemoryRemoteStore> {
    let remote = remote_store();
    remote.seed(RemoteSnapshot {
        accounts: accounts.into_iter().map(AccountRecord::Active).collect(),
        ..RemoteSnapshot::default()
    });
    remote
}

/// One client device
pub struct TestDevice {
    pub remote: Arc<MemoryRemoteStore>,
    pub local: Arc<MemoryLocalStore>,
    pub ctx: ServiceContext,
    pub session: Session,
}

impl TestDevice {
    /// New device over `remote` with default sync settings
    pub fn new(remote: Arc<MemoryRemoteStore>) -> Result<Self> {
        Self::with_sync(remote, SyncConfig::default())
    }

    pub fn with_sync(remote: Arc<MemoryRemoteStore>, sync: SyncConfig) -> Result<Self> {
        let local = Arc::new(MemoryLocalStore::new());
        let ctx = ServiceContextBuilder::new()
            .backend(remote.clone())
            .local_store(local.clone())
            .sync(sync)
            .build()
            .context("failed to build service context")?;

        Ok(Self {
            remote,
            local,
            ctx,
            session: Session::signed_out(),
        })
    }

    /// New device that has already pulled once
    pub async fn synced(remote: Arc<MemoryRemoteStore>) -> Result<Self> {
        let device = Self::new(remote)?;
        device.pull().await?;
        Ok(device)
    }

    pub async fn pull(&self) -> Result<()> {
        self.ctx.sync_engine().pull(PullOptions::default()).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.ctx.sync_engine().load_local().await?)
    }

    /// Cached copy of an account
    pub async fn account(&self, email: &str) -> Result<Account> {
        self.snapshot()
            .await?
            .account(email)
            .cloned()
            .with_context(|| format!("{email} is not cached"))
    }
}

/// Sync settings with no trigger cooldown
pub fn no_cooldown() -> SyncConfig {
    SyncConfig {
        cooldown_ms: 0,
        ..SyncConfig::default()
    }
}

/// Sync settings with a cooldown long enough to span a test
pub fn long_cooldown() -> SyncConfig {
    SyncConfig {
        cooldown_ms: Duration::from_secs(60).as_millis() as u64,
        ..SyncConfig::default()
    }
}
