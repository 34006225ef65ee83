//! End-to-end loyalty flows
//!
//! Registration, checkout, order settlement, referrals and the prize draw,
//! each checked on both the device cache and the remote store.

use anyhow::Result;
use integration_tests::*;
use loyalty_core::{
    DeliveryMethod, DomainError, OrderStatus, PrizeKind, SyncEvent, TransitionOutcome,
};
use loyalty_service::dto::{GuestCheckoutRequest, LoginRequest};
use loyalty_service::{AccountService, OrderService, PrizeService, ServiceError, Session};

/// Walk an order through to approval
async fn approve(device: &TestDevice, order_id: &str) -> Result<()> {
    let orders = OrderService::new(&device.ctx);
    for status in [OrderStatus::Preparing, OrderStatus::Delivered, OrderStatus::Approved] {
        orders.transition(order_id, status).await?;
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_register_then_login_on_another_device() -> Result<()> {
    let remote = remote_store();
    let mut till = TestDevice::synced(remote.clone()).await?;
    let request = register_request();
    let email = request.email.clone();
    let phone = request.phone.clone();

    let account = AccountService::new(&till.ctx).register(&mut till.session, request).await?;
    assert_eq!(account.wallet_balance, 1.0);
    assert_eq!(till.session.email(), Some(email.as_str()));

    // Fresh device, nothing cached: login falls back to the remote store
    let mut phone_device = TestDevice::new(remote)?;
    let logged_in = AccountService::new(&phone_device.ctx)
        .login(
            &mut phone_device.session,
            LoginRequest {
                identifier: phone,
                password: PASSWORD.to_string(),
            },
        )
        .await?;
    assert_eq!(logged_in.email, email);
    assert!(phone_device.account(&email).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_session_ends_when_account_is_unified_away() -> Result<()> {
    let shared_phone = "04127778899";
    let master = AccountFixture::unique().phone(shared_phone).points(50).build();
    let victim = AccountFixture::unique().phone(shared_phone).build();
    let mut device = TestDevice::synced(remote_with(vec![master.clone(), victim.clone()])).await?;

    device.session.sign_in(victim);
    device.session.save(device.ctx.cache()).await?;
    let mut events = device.ctx.bus().subscribe();
    device.ctx.unifier().run().await?;

    // The unifier's pull announces a merge; the session follows it
    let accounts = AccountService::new(&device.ctx);
    loop {
        if let SyncEvent::MergeCompleted(_) = events.recv().await? {
            break;
        }
    }
    assert!(!accounts.refresh(&mut device.session).await?);
    assert!(!device.session.is_signed_in());
    assert!(Session::load(device.ctx.cache()).await?.account().is_none());

    let snapshot = device.snapshot().await?;

    let mut owner = Session::signed_out();
    owner.sign_in(master);
    assert!(owner.refresh_from(&snapshot));
    assert_eq!(owner.account().map(|a| a.points), Some(50));
    Ok(())
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_checkout_then_reject_refunds_once() -> Result<()> {
    let remote = remote_store();
    let mut device = TestDevice::synced(remote.clone()).await?;
    let request = register_request();
    let email = request.email.clone();
    AccountService::new(&device.ctx).register(&mut device.session, request).await?;

    let orders = OrderService::new(&device.ctx);
    let receipt = orders.checkout(&email, cart(1.0)).await?;
    assert!(receipt.confirmed);
    assert_eq!(receipt.wallet_balance, 0.0);
    assert_eq!(remote.account(&email).map(|a| a.wallet_balance), Some(0.0));

    let outcome = orders.transition(&receipt.order_id, OrderStatus::Rejected).await?;
    assert!(matches!(outcome, TransitionOutcome::Applied { .. }));
    let again = orders.transition(&receipt.order_id, OrderStatus::Rejected).await?;
    assert_eq!(again, TransitionOutcome::NoOp);

    assert_eq!(device.account(&email).await?.wallet_balance, 1.0);
    assert_eq!(remote.account(&email).map(|a| a.wallet_balance), Some(1.0));

    // A later pull must not credit the refund a second time
    device.pull().await?;
    assert_eq!(device.account(&email).await?.wallet_balance, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_wallet_is_a_typed_failure() -> Result<()> {
    let account = AccountFixture::unique().wallet(1.0).build();
    let email = account.email.clone();
    let remote = remote_with(vec![account]);
    let device = TestDevice::synced(remote.clone()).await?;

    let err = OrderService::new(&device.ctx)
        .checkout(&email, cart(5.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InsufficientBalance { .. })
    ));

    let cached = device.account(&email).await?;
    assert!(cached.orders.is_empty());
    assert_eq!(cached.wallet_balance, 1.0);
    assert!(remote.account(&email).map(|a| a.orders.is_empty()).unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn test_offline_checkout_settles_after_reconnect() -> Result<()> {
    let account = AccountFixture::unique().wallet(5.0).build();
    let email = account.email.clone();
    let remote = remote_with(vec![account]);
    let device = TestDevice::synced(remote.clone()).await?;

    remote.set_offline(true);
    let receipt = OrderService::new(&device.ctx).checkout(&email, cart(2.0)).await?;
    assert!(!receipt.confirmed);
    assert_eq!(device.account(&email).await?.wallet_balance, 3.0);

    remote.set_offline(false);
    device.pull().await?;
    device.ctx.sync_engine().push_local().await?;

    let stored = remote.account(&email).expect("account on the server");
    assert_eq!(stored.wallet_balance, 3.0);
    assert!(stored.order(&receipt.order_id).is_some());

    let cached = device.account(&email).await?;
    assert_eq!(cached.wallet_balance, 3.0);
    let order = cached.order(&receipt.order_id).expect("order kept on the device");
    assert!(!order.awaiting_confirmation);
    Ok(())
}

#[tokio::test]
async fn test_referrer_paid_on_approval_and_kept() -> Result<()> {
    let referrer = AccountFixture::unique().referral_code("ROSA2024").build();
    let referrer_email = referrer.email.clone();
    let remote = remote_with(vec![referrer]);
    let mut device = TestDevice::synced(remote.clone()).await?;

    let mut request = register_request();
    request.referred_by = Some("rosa2024".to_string());
    let email = request.email.clone();
    AccountService::new(&device.ctx).register(&mut device.session, request).await?;

    let receipt = OrderService::new(&device.ctx).checkout(&email, cart(0.0)).await?;
    approve(&device, &receipt.order_id).await?;

    // The device still caches the referrer at zero; the approval must not push it
    assert_eq!(remote.account(&referrer_email).map(|a| a.wallet_balance), Some(1.0));

    let buyer = device.account(&email).await?;
    assert_eq!(buyer.wallet_balance, 1.0 + receipt.reward);
    assert_eq!(buyer.lifetime_spent, 20.0);
    assert_eq!(remote.account(&email).map(|a| a.wallet_balance), Some(buyer.wallet_balance));

    device.pull().await?;
    assert_eq!(device.account(&referrer_email).await?.wallet_balance, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_guest_order_reaches_other_devices() -> Result<()> {
    let remote = remote_store();
    let storefront = TestDevice::synced(remote.clone()).await?;
    let till = TestDevice::synced(remote.clone()).await?;

    let order = OrderService::new(&storefront.ctx)
        .place_guest_order(GuestCheckoutRequest {
            name: "Invitado".to_string(),
            phone: "04161234567".to_string(),
            items: cart(0.0).items,
            delivery: DeliveryMethod::Pickup,
            payment_method: "cash".to_string(),
        })
        .await?;

    till.pull().await?;
    OrderService::new(&till.ctx)
        .transition(&order.id, OrderStatus::Preparing)
        .await?;
    assert_eq!(
        remote.guest_order(&order.id).map(|o| o.status),
        Some(OrderStatus::Preparing)
    );
    Ok(())
}

// ============================================================================
// Prize Draw
// ============================================================================

#[tokio::test]
async fn test_draw_rolls_and_cooldown() -> Result<()> {
    let unlucky = AccountFixture::unique().build();
    let lucky = AccountFixture::unique().build();
    let remote = remote_with(vec![unlucky.clone(), lucky.clone()]);
    remote.set_prize_catalog(half_and_half_catalog());
    let device = TestDevice::synced(remote.clone()).await?;
    let prizes = PrizeService::new(&device.ctx);

    let miss = prizes.draw_with_roll(&unlucky.email, 0.49).await?;
    assert!(!miss.won);
    assert_eq!(miss.prize.kind, PrizeKind::Nothing);

    let hit = prizes.draw_with_roll(&lucky.email, 0.51).await?;
    assert_eq!(hit.prize.id, "points-10");
    assert_eq!(hit.points, 10);
    assert_eq!(remote.account(&lucky.email).map(|a| a.points), Some(10));
    assert_eq!(device.account(&lucky.email).await?.points, 10);

    let again = prizes.draw_with_roll(&lucky.email, 0.99).await;
    assert!(matches!(again, Err(ServiceError::DrawRejected(_))));
    assert_eq!(remote.account(&lucky.email).map(|a| a.points), Some(10));
    Ok(())
}
