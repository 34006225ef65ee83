//! Realtime sync loop
//!
//! Remote inserts and updates on the accounts collection trigger a pull, as
//! do local-changed notifications from other processes sharing the cache.
//! Remote deletes are ignored: tombstones arrive through the next pull. Each
//! trigger source passes through the [`SyncGuard`] so a pull that itself
//! causes notifications cannot loop.
//!
//! A remote change that lands inside the cooldown is deferred rather than
//! dropped: the run loop pulls once more when the cooldown ends.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use loyalty_core::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Collection, SyncEvent};
use tracing::{debug, info, warn};

use super::error::{SyncError, SyncResult};
use super::guard::SyncGuard;
use super::sync::{PullOptions, SyncEngine};
use crate::dto::PullReport;

/// Guard channel for remote account changes
pub const REMOTE_CHANNEL: &str = "remote:accounts";
/// Guard channel for local-changed notifications
pub const LOCAL_CHANNEL: &str = "local";

pub struct RealtimeSync {
    engine: Arc<SyncEngine>,
    feed: Arc<dyn ChangeFeed>,
    guard: SyncGuard,
    deferred: AtomicBool,
}

impl RealtimeSync {
    pub fn new(engine: Arc<SyncEngine>, feed: Arc<dyn ChangeFeed>, cooldown: Duration) -> Self {
        Self {
            engine,
            feed,
            guard: SyncGuard::new(cooldown),
            deferred: AtomicBool::new(false),
        }
    }

    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    /// Whether a suppressed remote change still waits for its pull
    pub fn has_deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
    }

    /// React to one remote change. `None` when no pull ran; a change caught
    /// by the cooldown is remembered for [`Self::pull_deferred`].
    pub async fn handle_change(&self, event: ChangeEvent) -> SyncResult<Option<PullReport>> {
        if event.collection != Collection::Accounts {
            return Ok(None);
        }
        if event.kind == ChangeKind::Delete {
            debug!("Ignoring remote delete");
            return Ok(None);
        }
        if !self.guard.try_acquire(REMOTE_CHANNEL) {
            debug!(channel = REMOTE_CHANNEL, "Remote change deferred until cooldown ends");
            self.deferred.store(true, Ordering::SeqCst);
            return Ok(None);
        }

        self.deferred.store(false, Ordering::SeqCst);
        self.engine.pull(PullOptions::default()).await.map(Some)
    }

    /// Pull for a remote change that arrived during the cooldown.
    ///
    /// `None` when nothing was deferred or the cooldown is still running; in
    /// the latter case the change stays deferred.
    pub async fn pull_deferred(&self) -> SyncResult<Option<PullReport>> {
        if !self.deferred.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        if !self.guard.try_acquire(REMOTE_CHANNEL) {
            self.deferred.store(true, Ordering::SeqCst);
            return Ok(None);
        }

        debug!("Pulling deferred remote change");
        self.engine.pull(PullOptions::default()).await.map(Some)
    }

    fn deferred_wait(&self) -> Duration {
        self.guard.remaining(REMOTE_CHANNEL).unwrap_or_default()
    }

    /// React to a bus event from another process. Only local changes pull.
    pub async fn handle_local_event(&self, event: &SyncEvent) -> SyncResult<Option<PullReport>> {
        let SyncEvent::LocalChanged(changed) = event else {
            return Ok(None);
        };
        if !self.guard.try_acquire(LOCAL_CHANNEL) {
            debug!(channel = LOCAL_CHANNEL, key = %changed.key, "Trigger suppressed by cooldown");
            return Ok(None);
        }

        self.engine.pull(PullOptions::default()).await.map(Some)
    }

    async fn subscribe(&self) -> SyncResult<ChangeStream> {
        self.feed
            .subscribe(Collection::Accounts)
            .await
            .map_err(SyncError::Remote)
    }

    /// Run until `shutdown` resolves.
    ///
    /// A closed change feed is resubscribed once; a second failure ends the
    /// loop with the error. Pull failures are logged and the loop goes on.
    /// A deferred remote change is pulled as soon as its cooldown ends.
    pub async fn run<S, F>(&self, local_events: S, shutdown: F) -> SyncResult<()>
    where
        S: Stream<Item = SyncEvent> + Unpin,
        F: Future<Output = ()>,
    {
        let mut changes = self.subscribe().await?;
        let mut local_events = local_events.fuse();
        tokio::pin!(shutdown);

        info!("Realtime sync started");

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                change = changes.next() => match change {
                    Some(event) => {
                        if let Err(e) = self.handle_change(event).await {
                            warn!(error = %e, "Pull after remote change failed");
                        }
                    }
                    None => {
                        warn!("Change feed closed, resubscribing");
                        changes = self.subscribe().await?;
                    }
                },
                Some(event) = local_events.next() => {
                    if let Err(e) = self.handle_local_event(&event).await {
                        warn!(error = %e, "Pull after local change failed");
                    }
                }
                () = tokio::time::sleep(self.deferred_wait()), if self.has_deferred() => {
                    if let Err(e) = self.pull_deferred().await {
                        warn!(error = %e, "Deferred pull failed");
                    }
                }
            }
        }

        info!("Realtime sync stopped");
        Ok(())
    }
}

impl std::fmt::Debug for RealtimeSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSync")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_cache::{LocalCache, MemoryLocalStore};
    use loyalty_core::{Account, MergePolicy, RemoteStore};
    use loyalty_db::MemoryRemoteStore;

    use crate::services::bus::SyncBus;

    fn realtime(remote: Arc<MemoryRemoteStore>, cooldown: Duration) -> RealtimeSync {
        let cache = LocalCache::new(Arc::new(MemoryLocalStore::new()));
        let engine = Arc::new(SyncEngine::new(
            remote.clone(),
            remote.clone(),
            cache,
            SyncBus::default(),
            MergePolicy::default(),
        ));
        RealtimeSync::new(engine, remote, cooldown)
    }

    fn update() -> ChangeEvent {
        ChangeEvent {
            collection: Collection::Accounts,
            kind: ChangeKind::Update,
        }
    }

    #[tokio::test]
    async fn test_second_trigger_within_cooldown_is_deferred() {
        let remote = Arc::new(MemoryRemoteStore::default());
        let sync = realtime(remote, Duration::from_secs(60));

        assert!(sync.handle_change(update()).await.unwrap().is_some());
        assert!(!sync.has_deferred());
        assert!(sync.handle_change(update()).await.unwrap().is_none());
        assert!(sync.has_deferred());

        // Still inside the cooldown: nothing pulled, change kept
        assert!(sync.pull_deferred().await.unwrap().is_none());
        assert!(sync.has_deferred());

        // Channels are independent
        let local = SyncEvent::local_changed("loyalty:accounts");
        assert!(sync.handle_local_event(&local).await.unwrap().is_some());
        assert!(sync.handle_local_event(&local).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deferred_change_is_pulled_after_cooldown() {
        let remote = Arc::new(MemoryRemoteStore::default());
        let sync = realtime(remote.clone(), Duration::from_millis(100));

        remote
            .upsert_accounts(&[Account::new("a@x.com", "0414", "A")])
            .await
            .unwrap();
        assert!(sync.handle_change(update()).await.unwrap().is_some());

        remote
            .upsert_accounts(&[Account::new("b@x.com", "0424", "B")])
            .await
            .unwrap();
        assert!(sync.handle_change(update()).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(sync.pull_deferred().await.unwrap().is_some());
        assert!(!sync.has_deferred());
        let local = sync.engine.load_local().await.unwrap();
        assert!(local.account("b@x.com").is_some());

        // Nothing left to pull
        assert!(sync.pull_deferred().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_delivers_change_inside_cooldown() {
        let remote = Arc::new(MemoryRemoteStore::default());
        let sync = Arc::new(realtime(remote.clone(), Duration::from_millis(300)));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let runner = {
            let sync = sync.clone();
            tokio::spawn(async move {
                let shutdown = async {
                    let _ = stop_rx.await;
                };
                sync.run(futures::stream::pending(), shutdown).await
            })
        };

        remote
            .upsert_accounts(&[Account::new("a@x.com", "0414", "A")])
            .await
            .unwrap();
        for _ in 0..100 {
            remote.emit(Collection::Accounts, ChangeKind::Insert);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if sync.engine.load_local().await.unwrap().account("a@x.com").is_some() {
                break;
            }
        }

        // One announcement only, well inside the cooldown
        remote
            .upsert_accounts(&[Account::new("b@x.com", "0424", "B")])
            .await
            .unwrap();
        remote.emit(Collection::Accounts, ChangeKind::Insert);

        let mut reached = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if sync.engine.load_local().await.unwrap().account("b@x.com").is_some() {
                reached = true;
                break;
            }
        }
        assert!(reached);

        stop_tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_deletes_and_other_events_do_not_pull() {
        let remote = Arc::new(MemoryRemoteStore::default());
        let sync = realtime(remote, Duration::ZERO);

        let delete = ChangeEvent {
            collection: Collection::Accounts,
            kind: ChangeKind::Delete,
        };
        assert!(sync.handle_change(delete).await.unwrap().is_none());

        let orders = ChangeEvent {
            collection: Collection::Orders,
            kind: ChangeKind::Insert,
        };
        assert!(sync.handle_change(orders).await.unwrap().is_none());

        let merged = SyncEvent::merge_completed(0, 0);
        assert!(sync.handle_local_event(&merged).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_pulls_on_remote_change_until_shutdown() {
        let remote = Arc::new(MemoryRemoteStore::default());
        let sync = Arc::new(realtime(remote.clone(), Duration::ZERO));
        let mut merges = sync.engine.bus().subscribe();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let runner = {
            let sync = sync.clone();
            tokio::spawn(async move {
                let shutdown = async {
                    let _ = stop_rx.await;
                };
                sync.run(futures::stream::pending(), shutdown).await
            })
        };

        remote
            .upsert_accounts(&[Account::new("eva@example.com", "0416", "Eva")])
            .await
            .unwrap();

        // The runner may not have subscribed yet; announce until a merge lands
        let mut merged = None;
        for _ in 0..100 {
            remote.emit(Collection::Accounts, ChangeKind::Update);
            if let Ok(event) = tokio::time::timeout(Duration::from_millis(50), merges.recv()).await {
                merged = Some(event.unwrap());
                break;
            }
        }
        assert!(matches!(merged, Some(SyncEvent::MergeCompleted(_))));

        let local = sync.engine.load_local().await.unwrap();
        assert!(local.account("eva@example.com").is_some());

        stop_tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_fails_when_feed_unavailable() {
        let remote = Arc::new(MemoryRemoteStore::default());
        remote.set_offline(true);
        let sync = realtime(remote, Duration::ZERO);

        let result = sync
            .run(futures::stream::pending(), std::future::pending())
            .await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
    }
}
