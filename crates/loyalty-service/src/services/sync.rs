//! Reconciliation engine
//!
//! Pull fetches every remote collection first and only then touches the
//! local cache, so an unreachable remote leaves local state as it was. Every
//! write to the cached snapshot goes through the engine lock.
//!
//! Checkouts the order procedure could not reach are replayed before every
//! pull and push. The procedure is idempotent by order id, so a replay of an
//! order the server already holds debits nothing.

use std::sync::Arc;

use chrono::Utc;
use loyalty_cache::{keys, LocalCache};
use loyalty_core::ledger::settlement;
use loyalty_core::reconcile::merge_snapshot;
use loyalty_core::{
    Account, LedgerProcedures, MergeOptions, MergePolicy, Order, RemoteSnapshot, RemoteStore,
    Snapshot, SyncEvent,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::bus::SyncBus;
use super::error::{ServiceResult, SyncError, SyncResult};
use crate::dto::{PullReport, PushReport};

/// Options for a single pull
#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Drop local accounts the remote does not know about
    pub force_clean: bool,
}

impl PullOptions {
    pub fn force_clean() -> Self {
        Self { force_clean: true }
    }
}

/// Pulls, merges and pushes the synced collections
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    procedures: Arc<dyn LedgerProcedures>,
    cache: LocalCache,
    bus: SyncBus,
    policy: MergePolicy,
    lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        procedures: Arc<dyn LedgerProcedures>,
        cache: LocalCache,
        bus: SyncBus,
        policy: MergePolicy,
    ) -> Self {
        Self {
            remote,
            procedures,
            cache,
            bus,
            policy,
            lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Fetch all remote collections concurrently
    #[instrument(skip(self))]
    pub async fn fetch_remote(&self) -> SyncResult<RemoteSnapshot> {
        let (accounts, guest_orders, settings, prize_catalog) = futures::try_join!(
            self.remote.fetch_accounts(),
            self.remote.fetch_guest_orders(),
            self.remote.fetch_settings(),
            self.remote.fetch_prize_catalog(),
        )
        .map_err(SyncError::Remote)?;

        Ok(RemoteSnapshot {
            accounts,
            guest_orders,
            settings,
            prize_catalog,
        })
    }

    /// Send every checkout still awaiting confirmation to the order
    /// procedure, oldest first. Returns how many the server settled.
    ///
    /// An unreachable procedure stops the replay and leaves the rest for the
    /// next sync. A business rejection removes the order and returns its
    /// wallet amount.
    #[instrument(skip(self))]
    pub async fn confirm_pending_orders(&self) -> SyncResult<usize> {
        let local = self.load_local().await?;
        let mut pending: Vec<(String, Order)> = local
            .accounts
            .iter()
            .flat_map(|account| {
                account
                    .orders
                    .iter()
                    .filter(|o| o.awaiting_confirmation)
                    .map(move |o| (account.email.clone(), o.clone()))
            })
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }
        pending.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at));

        let mut confirmed = 0;
        for (email, mut order) in pending {
            order.awaiting_confirmation = false;
            match self.procedures.process_order(&email, &order).await {
                Ok(processed) => {
                    self.settle_local(&email, |account| {
                        settlement::confirm_order(account, &processed)
                    })
                    .await?;
                    info!(
                        order_id = %order.id,
                        wallet = processed.wallet_balance,
                        "Pending checkout confirmed"
                    );
                    confirmed += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(order_id = %order.id, error = %e, "Order procedure still unreachable");
                    break;
                }
                Err(e) if e.is_not_found() => {
                    debug!(order_id = %order.id, "Account not on the server yet, keeping checkout");
                }
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "Pending checkout refused, removing it");
                    self.settle_local(&email, |account| {
                        settlement::cancel_order(account, &order.id);
                    })
                    .await?;
                }
            }
        }
        Ok(confirmed)
    }

    /// Apply `settle` to one cached account under the engine lock
    async fn settle_local<F>(&self, email: &str, settle: F) -> SyncResult<()>
    where
        F: FnOnce(&mut Account),
    {
        {
            let _guard = self.lock.lock().await;
            let mut snapshot = self.cache.load_snapshot().await.map_err(SyncError::Cache)?;
            let Some(account) = snapshot.account_mut(email) else {
                return Ok(());
            };
            settle(account);
            self.cache
                .save_snapshot(&snapshot)
                .await
                .map_err(SyncError::Cache)?;
        }
        self.bus.publish(SyncEvent::local_changed(keys::ACCOUNTS));
        Ok(())
    }

    /// Fetch, merge into the cached snapshot and persist the result
    #[instrument(skip(self))]
    pub async fn pull(&self, options: PullOptions) -> SyncResult<PullReport> {
        self.confirm_pending_orders().await?;
        let remote = self.fetch_remote().await?;

        let report = {
            let _guard = self.lock.lock().await;
            let local = self.cache.load_snapshot().await.map_err(SyncError::Cache)?;

            let now = Utc::now();
            let merged = merge_snapshot(
                &local,
                &remote,
                &self.policy,
                MergeOptions {
                    force_clean: options.force_clean,
                },
                now,
            );

            self.cache
                .save_snapshot(&merged.snapshot)
                .await
                .map_err(SyncError::Cache)?;
            self.cache.mark_synced(now).await.map_err(SyncError::Cache)?;

            PullReport {
                accounts: merged.snapshot.accounts.len(),
                guest_orders: merged.snapshot.guest_orders.len(),
                orders_dropped: merged.orders_dropped,
                accounts_removed: merged.accounts_removed,
            }
        };

        info!(
            accounts = report.accounts,
            guest_orders = report.guest_orders,
            orders_dropped = report.orders_dropped,
            accounts_removed = report.accounts_removed,
            "Pull merged"
        );
        self.bus
            .publish(SyncEvent::merge_completed(report.accounts, report.guest_orders));

        Ok(report)
    }

    /// Upsert a snapshot's collections to the remote store
    #[instrument(skip(self, snapshot), fields(accounts = snapshot.accounts.len()))]
    pub async fn push(&self, snapshot: &Snapshot) -> SyncResult<PushReport> {
        self.remote
            .upsert_accounts(&snapshot.accounts)
            .await
            .map_err(SyncError::Remote)?;
        self.remote
            .upsert_guest_orders(&snapshot.guest_orders)
            .await
            .map_err(SyncError::Remote)?;

        let settings = match &snapshot.settings {
            Some(settings) => {
                self.remote
                    .upsert_settings(settings)
                    .await
                    .map_err(SyncError::Remote)?;
                true
            }
            None => false,
        };

        self.cache
            .mark_synced(Utc::now())
            .await
            .map_err(SyncError::Cache)?;

        let report = PushReport {
            accounts: snapshot.accounts.len(),
            guest_orders: snapshot.guest_orders.len(),
            settings,
        };
        self.bus
            .publish(SyncEvent::push_completed(report.accounts, report.guest_orders));

        Ok(report)
    }

    /// Push, logging a failure instead of returning it. `false` when the push failed.
    pub async fn push_best_effort(&self, snapshot: &Snapshot) -> bool {
        match self.push(snapshot).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Push failed, local changes kept for the next sync");
                false
            }
        }
    }

    /// Best-effort push of just the given records.
    ///
    /// Use-case services push only what they changed, so accounts they did
    /// not touch never overwrite newer remote copies.
    pub async fn push_records_best_effort(&self, accounts: &[Account], guest_orders: &[Order]) -> bool {
        let partial = Snapshot {
            accounts: accounts.to_vec(),
            guest_orders: guest_orders.to_vec(),
            settings: None,
            prize_catalog: Vec::new(),
        };
        self.push_best_effort(&partial).await
    }

    /// Push whatever is currently cached, after replaying pending checkouts
    pub async fn push_local(&self) -> SyncResult<PushReport> {
        self.confirm_pending_orders().await?;
        let snapshot = self.load_local().await?;
        self.push(&snapshot).await
    }

    /// Drop everything this device has cached, session included
    #[instrument(skip(self))]
    pub async fn wipe_local(&self) -> SyncResult<()> {
        {
            let _guard = self.lock.lock().await;
            let local = self.cache.load_snapshot().await.map_err(SyncError::Cache)?;
            let pending = local
                .accounts
                .iter()
                .flat_map(|a| a.orders.iter())
                .filter(|o| o.awaiting_confirmation)
                .count();
            if pending > 0 {
                warn!(pending, "Wiping cache with checkouts still awaiting confirmation");
            }
            self.cache.clear().await.map_err(SyncError::Cache)?;
        }
        info!("Local cache wiped");
        self.bus.publish(SyncEvent::local_changed(keys::ACCOUNTS));
        Ok(())
    }

    pub async fn load_local(&self) -> SyncResult<Snapshot> {
        self.cache.load_snapshot().await.map_err(SyncError::Cache)
    }

    /// Apply `change` to the cached snapshot and persist it.
    ///
    /// Nothing is saved when `change` fails. Returns the closure's value and
    /// the snapshot as saved.
    pub async fn update_local<T, F>(&self, change: F) -> ServiceResult<(T, Snapshot)>
    where
        F: FnOnce(&mut Snapshot) -> ServiceResult<T>,
    {
        let (value, snapshot) = {
            let _guard = self.lock.lock().await;
            let mut snapshot = self.cache.load_snapshot().await.map_err(SyncError::Cache)?;
            let value = change(&mut snapshot)?;
            self.cache
                .save_snapshot(&snapshot)
                .await
                .map_err(SyncError::Cache)?;
            (value, snapshot)
        };

        self.bus.publish(SyncEvent::local_changed(keys::ACCOUNTS));
        Ok((value, snapshot))
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
