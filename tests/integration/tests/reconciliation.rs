//! Reconciliation scenarios
//!
//! Pull/merge behaviour, the duplicate unifier and realtime triggers, run
//! across one or more devices sharing an in-memory remote store.

use anyhow::Result;
use integration_tests::*;
use loyalty_cache::keys;
use loyalty_common::SyncConfig;
use loyalty_core::{
    ChangeEvent, ChangeKind, Collection, LocalStore, OrderStatus, RemoteStore,
};
use loyalty_service::dto::UnifyReport;
use loyalty_service::{AccountService, OrderService, PullOptions};

// ============================================================================
// Pull & Merge
// ============================================================================

#[tokio::test]
async fn test_outage_leaves_cache_untouched() -> Result<()> {
    let account = AccountFixture::unique().wallet(4.0).build();
    let remote = remote_with(vec![account]);
    let device = TestDevice::synced(remote.clone()).await?;
    let before = device.snapshot().await?;

    remote.set_offline(true);
    assert!(device.ctx.sync_engine().pull(PullOptions::default()).await.is_err());

    assert_eq!(device.snapshot().await?, before);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_cache_entry_loads_as_empty() -> Result<()> {
    let account = AccountFixture::unique().build();
    let email = account.email.clone();
    let device = TestDevice::synced(remote_with(vec![account])).await?;

    device.local.set(keys::ACCOUNTS, "{not json").await?;
    assert!(device.snapshot().await?.accounts.is_empty());

    device.pull().await?;
    assert!(device.snapshot().await?.account(&email).is_some());
    Ok(())
}

#[tokio::test]
async fn test_force_clean_drops_local_only_accounts() -> Result<()> {
    let remote = remote_with(vec![AccountFixture::unique().build()]);
    let device = TestDevice::synced(remote).await?;

    let stray = AccountFixture::unique().build();
    let stray_email = stray.email.clone();
    device
        .ctx
        .sync_engine()
        .update_local(|snapshot| {
            snapshot.accounts.push(stray);
            Ok(())
        })
        .await?;

    let kept = device.ctx.sync_engine().pull(PullOptions::default()).await?;
    assert_eq!(kept.accounts_removed, 0);
    assert!(device.snapshot().await?.account(&stray_email).is_some());

    let cleaned = device.ctx.sync_engine().pull(PullOptions::force_clean()).await?;
    assert_eq!(cleaned.accounts_removed, 1);
    assert!(device.snapshot().await?.account(&stray_email).is_none());
    Ok(())
}

#[tokio::test]
async fn test_one_sided_orders_are_filtered_by_age() -> Result<()> {
    let account = AccountFixture::unique().build();
    let email = account.email.clone();
    let remote = remote_with(vec![account.clone()]);
    let device = TestDevice::synced(remote.clone()).await?;

    // Server gains an old approved order the device never saw
    let stale = order_aged(3 * 24 * 60, OrderStatus::Approved);
    let mut server_copy = account;
    server_copy.orders.push(stale.clone());
    remote.upsert_accounts(&[server_copy]).await?;

    // Device holds a fresh order the server has not seen yet
    let fresh = order_aged(2, OrderStatus::Pending);
    let fresh_id = fresh.id.clone();
    device
        .ctx
        .sync_engine()
        .update_local(|snapshot| {
            if let Some(account) = snapshot.account_mut(&email) {
                account.orders.push(fresh);
            }
            Ok(())
        })
        .await?;

    let report = device.ctx.sync_engine().pull(PullOptions::default()).await?;
    assert_eq!(report.orders_dropped, 1);

    let cached = device.account(&email).await?;
    assert!(cached.order(&fresh_id).is_some());
    assert!(cached.order(&stale.id).is_none());
    Ok(())
}

#[tokio::test]
async fn test_repeated_pulls_are_stable() -> Result<()> {
    let remote = remote_with(vec![
        AccountFixture::unique().wallet(2.5).points(40).build(),
        AccountFixture::unique().order(order_aged(30, OrderStatus::Preparing)).build(),
    ]);
    let device = TestDevice::synced(remote).await?;
    let first = device.snapshot().await?;

    device.pull().await?;
    assert_eq!(device.snapshot().await?, first);
    Ok(())
}

#[tokio::test]
async fn test_two_devices_converge() -> Result<()> {
    let remote = remote_store();
    let mut till = TestDevice::synced(remote.clone()).await?;
    let phone = TestDevice::synced(remote.clone()).await?;

    let request = register_request();
    let email = request.email.clone();
    AccountService::new(&till.ctx).register(&mut till.session, request).await?;

    phone.pull().await?;
    let receipt = OrderService::new(&phone.ctx).checkout(&email, cart(0.0)).await?;
    assert!(receipt.confirmed);

    till.pull().await?;
    let on_till = till.account(&email).await?;
    let on_phone = phone.account(&email).await?;
    assert!(on_till.order(&receipt.order_id).is_some());
    assert_eq!(on_till.orders, on_phone.orders);
    assert_eq!(on_till.wallet_balance, on_phone.wallet_balance);
    Ok(())
}

// ============================================================================
// Duplicate Unifier
// ============================================================================

#[tokio::test]
async fn test_unifier_folds_shared_phone() -> Result<()> {
    let phone = "0414-555-0101";
    let remote = remote_with(vec![
        AccountFixture::unique().phone(phone).wallet(2.0).build(),
        AccountFixture::unique().phone(phone).wallet(3.0).admin().name("Dueño").build(),
        AccountFixture::unique().phone("04145550101").wallet(5.0).build(),
        AccountFixture::unique().build(),
    ]);
    let device = TestDevice::synced(remote.clone()).await?;

    let report = device.ctx.unifier().run().await?;
    assert_eq!(
        report,
        UnifyReport {
            groups_merged: 1,
            records_deleted: 2,
            groups_failed: 0,
        }
    );

    let snapshot = device.snapshot().await?;
    assert_eq!(snapshot.accounts.len(), 2);
    let master = snapshot
        .accounts
        .iter()
        .find(|a| a.is_admin())
        .expect("admin master survives");
    assert_eq!(master.wallet_balance, 10.0);
    assert_eq!(remote.account(&master.email).map(|a| a.wallet_balance), Some(10.0));

    let deleted = remote.snapshot().accounts.iter().filter(|r| r.is_deleted()).count();
    assert_eq!(deleted, 2);
    Ok(())
}

#[tokio::test]
async fn test_second_unifier_run_is_a_noop() -> Result<()> {
    let remote = remote_with(vec![
        AccountFixture::unique().phone("04241112233").wallet(1.0).build(),
        AccountFixture::unique().phone("04241112233").wallet(1.0).build(),
    ]);
    let device = TestDevice::synced(remote).await?;

    assert_eq!(device.ctx.unifier().run().await?.groups_merged, 1);
    assert_eq!(device.ctx.unifier().run().await?, UnifyReport::default());
    Ok(())
}

// ============================================================================
// Realtime Triggers
// ============================================================================

#[tokio::test]
async fn test_cooldown_suppresses_trigger_storm() -> Result<()> {
    let remote = remote_with(vec![AccountFixture::unique().build()]);
    let device = TestDevice::with_sync(remote, long_cooldown())?;
    let realtime = device.ctx.realtime();

    let update = || ChangeEvent {
        collection: Collection::Accounts,
        kind: ChangeKind::Update,
    };

    assert!(realtime.handle_change(update()).await?.is_some());
    for _ in 0..5 {
        assert!(realtime.handle_change(update()).await?.is_none());
    }
    // The storm collapses into one pending pull
    assert!(realtime.has_deferred());
    Ok(())
}

#[tokio::test]
async fn test_insert_inside_cooldown_still_reaches_cache() -> Result<()> {
    let remote = remote_store();
    let sync = SyncConfig {
        cooldown_ms: 200,
        ..SyncConfig::default()
    };
    let device = TestDevice::with_sync(remote.clone(), sync)?;
    let realtime = device.ctx.realtime();
    let insert = || ChangeEvent {
        collection: Collection::Accounts,
        kind: ChangeKind::Insert,
    };

    let first = AccountFixture::customer("a@x.com").build();
    remote.upsert_accounts(&[first]).await?;
    assert!(realtime.handle_change(insert()).await?.is_some());

    let second = AccountFixture::customer("b@x.com").build();
    remote.upsert_accounts(&[second]).await?;
    assert!(realtime.handle_change(insert()).await?.is_none());
    assert!(device.snapshot().await?.account("b@x.com").is_none());

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    assert!(realtime.pull_deferred().await?.is_some());
    assert!(device.snapshot().await?.account("b@x.com").is_some());
    Ok(())
}

#[tokio::test]
async fn test_remote_change_refreshes_cache() -> Result<()> {
    let remote = remote_store();
    let device = TestDevice::with_sync(remote.clone(), no_cooldown())?;
    let realtime = device.ctx.realtime();

    let account = AccountFixture::unique().build();
    let email = account.email.clone();
    remote.upsert_accounts(&[account]).await?;

    let report = realtime
        .handle_change(ChangeEvent {
            collection: Collection::Accounts,
            kind: ChangeKind::Insert,
        })
        .await?;
    assert_eq!(report.map(|r| r.accounts), Some(1));
    assert!(device.snapshot().await?.account(&email).is_some());
    Ok(())
}
