//! Settlement - the money-moving side of the ledger
//!
//! These functions are what the authoritative procedures execute against the
//! stored account. Clients call [`credit_approval`] only to mirror a
//! procedure that already succeeded.

use chrono::{DateTime, Utc};

use super::draw::check_draw_eligibility;
use super::reward::{predict_reward, referrer_bonus_for, tier_for_spending, RewardPolicy};
use crate::entities::{Account, Order, OrderStatus, PaymentStatus, Prize, PrizeKind};
use crate::error::DomainError;
use crate::traits::ProcessedOrder;
use crate::value_objects::generate_referral_code;

/// Prepare a freshly registered account: referral code and welcome bonus
pub fn open_account(account: &mut Account, welcome_bonus_usd: f64) {
    if account.referral_code.trim().is_empty() {
        account.referral_code = generate_referral_code();
    }
    account.credit_wallet(welcome_bonus_usd);
}

/// Credit an approved order: reward to the wallet, total to lifetime
/// spending, one point per whole dollar, and a tier re-check
pub fn credit_approval(account: &mut Account, order: &Order) {
    account.credit_wallet(order.reward);
    account.lifetime_spent += order.total;
    account.points += order.total.floor() as i64;
    account.tier = account.tier.max(tier_for_spending(account.lifetime_spent));
}

/// Store a checkout on the account, debiting the wallet amount it used.
///
/// Replaying an order id that is already stored returns the stored result
/// without debiting again.
pub fn record_order(
    account: &mut Account,
    order: &Order,
    policy: &RewardPolicy,
    now: DateTime<Utc>,
) -> Result<ProcessedOrder, DomainError> {
    let wallet_balance = account.wallet_balance;
    if let Some(existing) = account.order_mut(&order.id) {
        existing.awaiting_confirmation = false;
        return Ok(ProcessedOrder {
            order_id: existing.id.clone(),
            reward: existing.reward,
            wallet_balance,
        });
    }

    account.debit_wallet(order.balance_used)?;

    let mut stored = order.clone();
    stored.reward = predict_reward(account, order.subtotal(), policy, now);
    stored.owner_email = Some(account.email.clone());
    stored.awaiting_confirmation = false;
    account.next_purchase_multiplier = None;

    let processed = ProcessedOrder {
        order_id: stored.id.clone(),
        reward: stored.reward,
        wallet_balance: account.wallet_balance,
    };
    account.orders.insert(0, stored);
    Ok(processed)
}

/// Adopt the server's answer for a checkout already stored on the account
pub fn confirm_order(account: &mut Account, processed: &ProcessedOrder) {
    account.wallet_balance = processed.wallet_balance;
    if let Some(order) = account.order_mut(&processed.order_id) {
        order.reward = processed.reward;
        order.awaiting_confirmation = false;
    }
}

/// Remove a stored checkout and return its wallet amount.
///
/// Returns `None` when the account holds no such order.
pub fn cancel_order(account: &mut Account, order_id: &str) -> Option<f64> {
    let index = account.orders.iter().position(|o| o.id == order_id)?;
    let order = account.orders.remove(index);
    account.credit_wallet(order.balance_used);
    Some(order.balance_used)
}

/// Mark an order approved and paid. `false` when it already was.
pub fn approve_order_record(order: &mut Order) -> Result<bool, DomainError> {
    match order.status {
        OrderStatus::Approved => Ok(false),
        OrderStatus::Rejected => Err(DomainError::InvalidTransition {
            from: OrderStatus::Rejected,
            to: OrderStatus::Approved,
        }),
        _ => {
            order.status = OrderStatus::Approved;
            order.payment_status = PaymentStatus::Paid;
            Ok(true)
        }
    }
}

/// Mark an order rejected, returning the wallet amount to refund (zero once refunded)
pub fn reject_order_record(order: &mut Order) -> Result<f64, DomainError> {
    if order.status == OrderStatus::Approved {
        return Err(DomainError::InvalidTransition {
            from: OrderStatus::Approved,
            to: OrderStatus::Rejected,
        });
    }

    order.status = OrderStatus::Rejected;
    let refund = if order.refunded { 0.0 } else { order.balance_used.max(0.0) };
    order.refunded = true;
    Ok(refund)
}

/// Approve an account-owned order and credit it.
///
/// Returns the approved order's subtotal for the referrer bonus, or `None`
/// when the order was already approved.
pub fn approve_owned_order(account: &mut Account, order_id: &str) -> Result<Option<f64>, DomainError> {
    let order = account
        .order_mut(order_id)
        .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;

    if !approve_order_record(order)? {
        return Ok(None);
    }

    let approved = order.clone();
    credit_approval(account, &approved);
    Ok(Some(approved.subtotal()))
}

/// Reject an account-owned order and refund its wallet amount once
pub fn reject_owned_order(account: &mut Account, order_id: &str) -> Result<f64, DomainError> {
    let order = account
        .order_mut(order_id)
        .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;

    let refund = reject_order_record(order)?;
    account.credit_wallet(refund);
    Ok(refund)
}

/// Pay the referral bonus for an approved subtotal, returning the amount paid
pub fn pay_referrer(referrer: &mut Account, subtotal_usd: f64) -> f64 {
    let bonus = referrer_bonus_for(referrer, subtotal_usd);
    referrer.credit_wallet(bonus);
    bonus
}

/// Find the account owning a referral code (case-insensitive)
pub fn find_referrer<'a>(accounts: &'a mut [Account], code: &str) -> Option<&'a mut Account> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    accounts
        .iter_mut()
        .find(|a| a.referral_code.eq_ignore_ascii_case(code))
}

/// Credit a drawn prize and stamp the draw time
pub fn apply_prize(
    account: &mut Account,
    prize: &Prize,
    at: DateTime<Utc>,
    cooldown_days: i64,
) -> Result<(), DomainError> {
    check_draw_eligibility(account, cooldown_days, at)?;

    match prize.kind {
        PrizeKind::Points => account.points += prize.value.round() as i64,
        PrizeKind::Cashback => account.credit_wallet(prize.value),
        PrizeKind::Nothing => {}
    }
    account.last_draw_at = Some(at);
    Ok(())
}
