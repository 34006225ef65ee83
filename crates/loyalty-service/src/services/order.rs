//! Order service - checkout, guest orders and lifecycle transitions
//!
//! Money moves only through the ledger procedures. A procedure that succeeds
//! is then mirrored into the cached snapshot with the same settlement rule,
//! applied to the cached order's own state so a pull that already brought the
//! settled order in is never credited twice.

use chrono::Utc;
use loyalty_core::ledger::settlement;
use loyalty_core::lifecycle;
use loyalty_core::{
    Account, Delivery, DeliveryMethod, GuestContact, LifecycleEffect, LineItem, Order, OrderStatus, Snapshot,
    TransitionOutcome,
};
use tracing::{info, instrument, warn};
use validator::Validate;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use crate::dto::{CheckoutReceipt, CheckoutRequest, GuestCheckoutRequest};

pub struct OrderService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> OrderService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn delivery(&self, method: DeliveryMethod) -> Delivery {
        match method {
            DeliveryMethod::Pickup => Delivery::pickup(),
            DeliveryMethod::Delivery => Delivery::delivery(self.ctx.loyalty().delivery_fee_usd),
        }
    }

    /// Check out a cart for an account.
    ///
    /// The order is stored locally with its wallet debit before
    /// `process_order` runs. When the procedure is unreachable the order stays
    /// local, marked as awaiting confirmation, and the next sync replays it.
    /// When it rejects the order the local write is undone and the rejection
    /// returned.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn checkout(&self, email: &str, request: CheckoutRequest) -> ServiceResult<CheckoutReceipt> {
        request.validate()?;

        let items: Vec<LineItem> = request.items.iter().map(LineItem::from).collect();
        let mut order = Order::new(items, self.delivery(request.delivery), request.payment_method.trim());
        order.balance_used = request.wallet_amount_usd;

        let policy = self.ctx.loyalty().reward_policy();
        let engine = self.ctx.sync_engine();

        let ((stored, previous_multiplier, predicted_wallet), _) = engine
            .update_local(|snapshot| {
                let account = snapshot
                    .account_mut(email)
                    .ok_or_else(|| ServiceError::not_found("Account", email))?;
                let multiplier = account.next_purchase_multiplier;

                let processed = settlement::record_order(account, &order, &policy, Utc::now())?;
                let stored = account
                    .order(&processed.order_id)
                    .cloned()
                    .ok_or_else(|| ServiceError::internal("checkout order was not stored"))?;
                Ok((stored, multiplier, processed.wallet_balance))
            })
            .await?;

        let (reward, wallet_balance, confirmed) =
            match self.ctx.procedures().process_order(email, &stored).await {
                Ok(processed) => {
                    engine
                        .update_local(|snapshot| {
                            if let Some(account) = snapshot.account_mut(email) {
                                settlement::confirm_order(account, &processed);
                            }
                            Ok(())
                        })
                        .await?;
                    (processed.reward, processed.wallet_balance, true)
                }
                Err(e) if e.is_transient() || e.is_not_found() => {
                    warn!(order_id = %stored.id, error = %e, "Order procedure unavailable, order kept unconfirmed");
                    engine
                        .update_local(|snapshot| {
                            if let Some(order) =
                                snapshot.account_mut(email).and_then(|a| a.order_mut(&stored.id))
                            {
                                order.awaiting_confirmation = true;
                            }
                            Ok(())
                        })
                        .await?;
                    (stored.reward, predicted_wallet, false)
                }
                Err(e) => {
                    engine
                        .update_local(|snapshot| {
                            undo_checkout(snapshot, email, &stored, previous_multiplier);
                            Ok(())
                        })
                        .await?;
                    return Err(e.into());
                }
            };

        let snapshot = engine.load_local().await?;
        if let Some(account) = snapshot.account(email) {
            engine
                .push_records_best_effort(std::slice::from_ref(account), &[])
                .await;
        }

        info!(order_id = %stored.id, total = stored.total, confirmed, "Checkout complete");
        Ok(CheckoutReceipt {
            order_id: stored.id.clone(),
            subtotal: stored.subtotal(),
            delivery_fee: stored.delivery.fee,
            total: stored.total,
            reward,
            wallet_balance,
            confirmed,
        })
    }

    /// Place an order without an account
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_guest_order(&self, request: GuestCheckoutRequest) -> ServiceResult<Order> {
        request.validate()?;

        let items: Vec<LineItem> = request.items.iter().map(LineItem::from).collect();
        let mut order = Order::new(items, self.delivery(request.delivery), request.payment_method.trim());
        order.guest = Some(GuestContact {
            name: request.name.trim().to_string(),
            phone: request.phone.trim().to_string(),
        });

        let placed = order.clone();
        let engine = self.ctx.sync_engine();
        engine
            .update_local(move |snapshot| {
                snapshot.guest_orders.insert(0, placed);
                Ok(())
            })
            .await?;
        engine
            .push_records_best_effort(&[], std::slice::from_ref(&order))
            .await;

        info!(order_id = %order.id, total = order.total, "Guest order placed");
        Ok(order)
    }

    /// Move an order to `target`.
    ///
    /// Approval and rejection run their procedure first; nothing changes
    /// locally if it fails.
    #[instrument(skip(self))]
    pub async fn transition(&self, order_id: &str, target: OrderStatus) -> ServiceResult<TransitionOutcome> {
        let engine = self.ctx.sync_engine();
        let snapshot = engine.load_local().await?;

        let mut order = find_order(&snapshot, order_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        let outcome = lifecycle::transition(&mut order, target)?;
        if outcome == TransitionOutcome::NoOp {
            return Ok(outcome);
        }

        match target {
            OrderStatus::Approved => self.ctx.procedures().approve_order(order_id).await?,
            OrderStatus::Rejected => self.ctx.procedures().reject_order(order_id).await?,
            _ => {}
        }

        let (touched, _) = engine
            .update_local(|snapshot| mirror_transition(snapshot, order_id, target))
            .await?;
        match touched {
            Touched::Account(account) => engine.push_records_best_effort(&[account], &[]).await,
            Touched::Guest(order) => engine.push_records_best_effort(&[], &[order]).await,
        };

        info!(order_id, status = %target, "Order status changed");
        Ok(outcome)
    }
}

fn find_order<'s>(snapshot: &'s Snapshot, order_id: &str) -> Option<&'s Order> {
    snapshot
        .accounts
        .iter()
        .find_map(|a| a.order(order_id))
        .or_else(|| snapshot.guest_orders.iter().find(|o| o.id == order_id))
}

/// Record that a transition changed
enum Touched {
    Account(Account),
    Guest(Order),
}

/// Apply a settled transition to the cached copy of the order
fn mirror_transition(snapshot: &mut Snapshot, order_id: &str, target: OrderStatus) -> ServiceResult<Touched> {
    if let Some(account) = snapshot
        .accounts
        .iter_mut()
        .find(|a| a.order(order_id).is_some())
    {
        let (outcome, settled) = {
            let order = account
                .order_mut(order_id)
                .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
            let outcome = lifecycle::transition(order, target)?;
            (outcome, order.clone())
        };

        match outcome.effect() {
            Some(LifecycleEffect::ReleaseReward { .. }) => settlement::credit_approval(account, &settled),
            Some(LifecycleEffect::RefundBalance { amount }) => account.credit_wallet(amount),
            None => {}
        }
        return Ok(Touched::Account(account.clone()));
    }

    let order = snapshot
        .guest_order_mut(order_id)
        .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
    lifecycle::transition(order, target)?;
    Ok(Touched::Guest(order.clone()))
}

/// Remove a checkout the order procedure refused and give the wallet back
fn undo_checkout(snapshot: &mut Snapshot, email: &str, order: &Order, multiplier: Option<f64>) {
    let Some(account) = snapshot.account_mut(email) else {
        return;
    };
    let before = account.orders.len();
    account.orders.retain(|o| o.id != order.id);
    if account.orders.len() < before {
        account.credit_wallet(order.balance_used);
        account.next_purchase_multiplier = multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_cache::MemoryLocalStore;
    use loyalty_core::{Account, AccountRecord, DomainError, RemoteSnapshot};
    use loyalty_db::MemoryRemoteStore;
    use std::sync::Arc;

    use crate::dto::CheckoutItem;
    use crate::services::context::ServiceContextBuilder;
    use crate::services::sync::PullOptions;

    const EMAIL: &str = "rosa@example.com";

    async fn context_with_wallet(wallet: f64) -> (ServiceContext, Arc<MemoryRemoteStore>) {
        let remote = Arc::new(MemoryRemoteStore::default());
        let mut account = Account::new(EMAIL, "04241234567", "Rosa");
        account.wallet_balance = wallet;
        remote.seed(RemoteSnapshot {
            accounts: vec![AccountRecord::Active(account)],
            ..RemoteSnapshot::default()
        });

        let ctx = ServiceContextBuilder::new()
            .backend(remote.clone())
            .local_store(Arc::new(MemoryLocalStore::new()))
            .build()
            .unwrap();
        ctx.sync_engine().pull(PullOptions::default()).await.unwrap();
        (ctx, remote)
    }

    fn cart(wallet: f64) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CheckoutItem {
                name: "Tequeños".to_string(),
                quantity: 4,
                unit_price_usd: 5.0,
                options: Vec::new(),
            }],
            delivery: DeliveryMethod::Pickup,
            payment_method: "cash".to_string(),
            wallet_amount_usd: wallet,
        }
    }

    async fn local_account(ctx: &ServiceContext) -> Account {
        ctx.sync_engine()
            .load_local()
            .await
            .unwrap()
            .account(EMAIL)
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_debits_once_and_confirms() {
        let (ctx, remote) = context_with_wallet(5.0).await;

        let receipt = OrderService::new(&ctx).checkout(EMAIL, cart(2.0)).await.unwrap();
        assert!(receipt.confirmed);
        assert_eq!(receipt.subtotal, 20.0);
        assert_eq!(receipt.total, 20.0);
        assert_eq!(receipt.reward, 1.0);
        assert_eq!(receipt.wallet_balance, 3.0);

        let local = local_account(&ctx).await;
        assert_eq!(local.wallet_balance, 3.0);
        assert_eq!(local.orders.len(), 1);
        assert_eq!(remote.account(EMAIL).unwrap().wallet_balance, 3.0);
    }

    #[tokio::test]
    async fn test_delivery_fee_comes_from_config() {
        let (ctx, _remote) = context_with_wallet(0.0).await;
        let mut request = cart(0.0);
        request.delivery = DeliveryMethod::Delivery;

        let receipt = OrderService::new(&ctx).checkout(EMAIL, request).await.unwrap();
        let fee = ctx.loyalty().delivery_fee_usd;
        assert_eq!(receipt.delivery_fee, fee);
        assert_eq!(receipt.total, 20.0 + fee);
    }

    #[tokio::test]
    async fn test_insufficient_wallet_saves_nothing() {
        let (ctx, _remote) = context_with_wallet(1.0).await;

        let err = OrderService::new(&ctx).checkout(EMAIL, cart(4.0)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientBalance { .. })
        ));

        let local = local_account(&ctx).await;
        assert_eq!(local.wallet_balance, 1.0);
        assert!(local.orders.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_while_offline_stays_unconfirmed() {
        let (ctx, remote) = context_with_wallet(5.0).await;
        remote.set_offline(true);

        let receipt = OrderService::new(&ctx).checkout(EMAIL, cart(2.0)).await.unwrap();
        assert!(!receipt.confirmed);
        assert_eq!(receipt.wallet_balance, 3.0);
        let local = local_account(&ctx).await;
        assert_eq!(local.orders.len(), 1);
        assert!(local.orders[0].awaiting_confirmation);
    }

    #[tokio::test]
    async fn test_offline_checkout_is_settled_on_reconnect() {
        let (ctx, remote) = context_with_wallet(5.0).await;
        remote.set_offline(true);
        let receipt = OrderService::new(&ctx).checkout(EMAIL, cart(2.0)).await.unwrap();
        assert!(!receipt.confirmed);

        remote.set_offline(false);
        let engine = ctx.sync_engine();
        engine.pull(PullOptions::default()).await.unwrap();
        engine.push_local().await.unwrap();

        let stored = remote.account(EMAIL).unwrap();
        assert_eq!(stored.wallet_balance, 3.0);
        assert!(stored.order(&receipt.order_id).is_some());

        let local = local_account(&ctx).await;
        assert_eq!(local.wallet_balance, 3.0);
        assert!(!local.order(&receipt.order_id).unwrap().awaiting_confirmation);

        // A second round must not debit again
        engine.pull(PullOptions::default()).await.unwrap();
        engine.push_local().await.unwrap();
        assert_eq!(remote.account(EMAIL).unwrap().wallet_balance, 3.0);
    }

    #[tokio::test]
    async fn test_rejection_refunds_exactly_once() {
        let (ctx, remote) = context_with_wallet(5.0).await;
        let service = OrderService::new(&ctx);
        let receipt = service.checkout(EMAIL, cart(2.0)).await.unwrap();

        let outcome = service
            .transition(&receipt.order_id, OrderStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(
            outcome.effect(),
            Some(LifecycleEffect::RefundBalance { amount: 2.0 })
        );

        let again = service
            .transition(&receipt.order_id, OrderStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(again, TransitionOutcome::NoOp);

        assert_eq!(local_account(&ctx).await.wallet_balance, 5.0);
        assert_eq!(remote.account(EMAIL).unwrap().wallet_balance, 5.0);

        let err = service
            .transition(&receipt.order_id, OrderStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_approval_credits_reward_and_spending() {
        let (ctx, remote) = context_with_wallet(0.0).await;
        let service = OrderService::new(&ctx);
        let receipt = service.checkout(EMAIL, cart(0.0)).await.unwrap();

        for status in [OrderStatus::Preparing, OrderStatus::Delivered, OrderStatus::Approved] {
            service.transition(&receipt.order_id, status).await.unwrap();
        }

        let local = local_account(&ctx).await;
        assert_eq!(local.wallet_balance, 1.0);
        assert_eq!(local.lifetime_spent, 20.0);
        assert_eq!(local.points, 20);

        let stored = remote.account(EMAIL).unwrap();
        assert_eq!(stored.wallet_balance, 1.0);
        assert_eq!(stored.order(&receipt.order_id).unwrap().status, OrderStatus::Approved);
    }

    #[tokio::test]
    async fn test_failed_procedure_leaves_order_untouched() {
        let (ctx, remote) = context_with_wallet(5.0).await;
        let service = OrderService::new(&ctx);
        let receipt = service.checkout(EMAIL, cart(2.0)).await.unwrap();

        remote.set_offline(true);
        assert!(service
            .transition(&receipt.order_id, OrderStatus::Rejected)
            .await
            .is_err());

        let local = local_account(&ctx).await;
        assert_eq!(local.wallet_balance, 3.0);
        assert_eq!(local.orders[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_guest_order_is_stored_and_pushed() {
        let (ctx, remote) = context_with_wallet(0.0).await;
        let request = GuestCheckoutRequest {
            name: "Invitado".to_string(),
            phone: "0412-7654321".to_string(),
            items: cart(0.0).items,
            delivery: DeliveryMethod::Pickup,
            payment_method: "cash".to_string(),
        };

        let order = OrderService::new(&ctx).place_guest_order(request).await.unwrap();
        assert!(order.is_guest());
        assert_eq!(order.guest.as_ref().unwrap().phone, "0412-7654321");
        assert!(remote.guest_order(&order.id).is_some());

        let outcome = OrderService::new(&ctx)
            .transition(&order.id, OrderStatus::Preparing)
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied { .. }));
    }
}
