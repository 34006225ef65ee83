//! Service context - dependency container for services
//!
//! Holds the remote ports, the local cache, the sync engine and the loyalty
//! parameters needed by services.

use std::sync::Arc;

use loyalty_cache::LocalCache;
use loyalty_common::{LoyaltyConfig, PasswordService, SyncConfig};
use loyalty_core::{ChangeFeed, LedgerProcedures, LocalStore, RemoteStore};

use super::bus::SyncBus;
use super::error::{ServiceError, ServiceResult};
use super::realtime::RealtimeSync;
use super::sync::SyncEngine;
use super::unifier::DuplicateUnifier;

/// Service context containing all dependencies
///
/// It provides access to:
/// - the remote store, its ledger procedures and its change feed
/// - the local cache and the sync engine that owns writes to it
/// - the typed sync bus
/// - password hashing and the loyalty/sync parameters
#[derive(Clone)]
pub struct ServiceContext {
    // Remote ports
    remote: Arc<dyn RemoteStore>,
    procedures: Arc<dyn LedgerProcedures>,
    change_feed: Arc<dyn ChangeFeed>,

    // Local state
    cache: LocalCache,
    bus: SyncBus,
    engine: Arc<SyncEngine>,

    // Services
    passwords: PasswordService,

    // Parameters
    loyalty: LoyaltyConfig,
    sync: SyncConfig,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        procedures: Arc<dyn LedgerProcedures>,
        change_feed: Arc<dyn ChangeFeed>,
        local_store: Arc<dyn LocalStore>,
        bus: SyncBus,
        loyalty: LoyaltyConfig,
        sync: SyncConfig,
    ) -> Self {
        let cache = LocalCache::new(local_store);
        let engine = Arc::new(SyncEngine::new(
            remote.clone(),
            procedures.clone(),
            cache.clone(),
            bus.clone(),
            sync.merge_policy(),
        ));

        Self {
            remote,
            procedures,
            change_feed,
            cache,
            bus,
            engine,
            passwords: PasswordService::new(),
            loyalty,
            sync,
        }
    }

    // === Remote Ports ===

    /// Get the remote store
    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    /// Get the authoritative ledger procedures
    pub fn procedures(&self) -> &dyn LedgerProcedures {
        self.procedures.as_ref()
    }

    // === Local State ===

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    /// Get the sync engine
    pub fn sync_engine(&self) -> &SyncEngine {
        self.engine.as_ref()
    }

    // === Services ===

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    /// Realtime sync loop over this context's change feed
    pub fn realtime(&self) -> RealtimeSync {
        RealtimeSync::new(
            self.engine.clone(),
            self.change_feed.clone(),
            self.sync.cooldown(),
        )
    }

    /// Duplicate unifier over this context's remote store
    pub fn unifier(&self) -> DuplicateUnifier {
        DuplicateUnifier::new(self.remote.clone(), self.engine.clone())
    }

    // === Parameters ===

    pub fn loyalty(&self) -> &LoyaltyConfig {
        &self.loyalty
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("remote", &"dyn RemoteStore")
            .field("cache", &self.cache)
            .field("loyalty", &self.loyalty)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    remote: Option<Arc<dyn RemoteStore>>,
    procedures: Option<Arc<dyn LedgerProcedures>>,
    change_feed: Option<Arc<dyn ChangeFeed>>,
    local_store: Option<Arc<dyn LocalStore>>,
    bus: Option<SyncBus>,
    loyalty: Option<LoyaltyConfig>,
    sync: Option<SyncConfig>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn procedures(mut self, procedures: Arc<dyn LedgerProcedures>) -> Self {
        self.procedures = Some(procedures);
        self
    }

    pub fn change_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.change_feed = Some(feed);
        self
    }

    /// Use one backend for the store, the procedures and the change feed
    pub fn backend<B>(self, backend: Arc<B>) -> Self
    where
        B: RemoteStore + LedgerProcedures + ChangeFeed + 'static,
    {
        self.remote(backend.clone())
            .procedures(backend.clone())
            .change_feed(backend)
    }

    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    pub fn bus(mut self, bus: SyncBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn loyalty(mut self, config: LoyaltyConfig) -> Self {
        self.loyalty = Some(config);
        self
    }

    pub fn sync(mut self, config: SyncConfig) -> Self {
        self.sync = Some(config);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.remote
                .ok_or_else(|| ServiceError::validation("remote is required"))?,
            self.procedures
                .ok_or_else(|| ServiceError::validation("procedures is required"))?,
            self.change_feed
                .ok_or_else(|| ServiceError::validation("change_feed is required"))?,
            self.local_store
                .ok_or_else(|| ServiceError::validation("local_store is required"))?,
            self.bus.unwrap_or_default(),
            self.loyalty.unwrap_or_default(),
            self.sync.unwrap_or_default(),
        ))
    }
}
