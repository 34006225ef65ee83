//! Order lifecycle state machine
//!
//! `pending → preparing → delivered → approved`, and any non-terminal state
//! may move to `rejected`. Money-moving transitions return a
//! [`LifecycleEffect`] that the caller settles through the ledger procedures;
//! this module never touches a wallet.

use crate::entities::{Order, OrderStatus, PaymentStatus};
use crate::error::DomainError;

/// Money movement a transition asks the caller to perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEffect {
    /// Credit the order's reward to its owner
    ReleaseReward { amount: f64 },
    /// Return the wallet balance spent on the order
    RefundBalance { amount: f64 },
}

/// Result of applying a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionOutcome {
    /// The order was already in the target state
    NoOp,
    Applied {
        from: OrderStatus,
        to: OrderStatus,
        effect: Option<LifecycleEffect>,
    },
}

impl TransitionOutcome {
    pub fn effect(&self) -> Option<LifecycleEffect> {
        match self {
            Self::NoOp => None,
            Self::Applied { effect, .. } => *effect,
        }
    }
}

/// Whether `from → to` is a legal forward move
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (Pending, Preparing) | (Preparing, Delivered) | (Delivered, Approved)
    ) || (!from.is_terminal() && to == Rejected)
}

/// Move `order` to `target`, returning the effect to settle
pub fn transition(order: &mut Order, target: OrderStatus) -> Result<TransitionOutcome, DomainError> {
    let from = order.status;
    if from == target {
        return Ok(TransitionOutcome::NoOp);
    }
    if !can_transition(from, target) {
        return Err(DomainError::InvalidTransition { from, to: target });
    }

    let effect = match target {
        OrderStatus::Approved => {
            order.payment_status = PaymentStatus::Paid;
            Some(LifecycleEffect::ReleaseReward {
                amount: order.reward,
            })
        }
        OrderStatus::Rejected => {
            let refund = (!order.refunded && order.balance_used > 0.0).then_some(
                LifecycleEffect::RefundBalance {
                    amount: order.balance_used,
                },
            );
            order.refunded = true;
            refund
        }
        _ => None,
    };

    order.status = target;
    Ok(TransitionOutcome::Applied {
        from,
        to: target,
        effect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Delivery, LineItem};

    fn order(status: OrderStatus) -> Order {
        let mut order = Order::new(vec![LineItem::new("Arepa", 2, 3.5)], Delivery::pickup(), "cash");
        order.status = status;
        order.reward = 0.35;
        order
    }

    #[test]
    fn test_forward_path() {
        let mut o = order(OrderStatus::Pending);
        for target in [OrderStatus::Preparing, OrderStatus::Delivered] {
            let outcome = transition(&mut o, target).unwrap();
            assert_eq!(outcome.effect(), None);
        }

        let outcome = transition(&mut o, OrderStatus::Approved).unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Applied {
                from: OrderStatus::Delivered,
                to: OrderStatus::Approved,
                effect: Some(LifecycleEffect::ReleaseReward { amount: 0.35 }),
            }
        );
        assert_eq!(o.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut o = order(OrderStatus::Approved);
        assert_eq!(transition(&mut o, OrderStatus::Approved).unwrap(), TransitionOutcome::NoOp);
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        let mut o = order(OrderStatus::Pending);
        let err = transition(&mut o, OrderStatus::Approved).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(o.status, OrderStatus::Pending);
    }

    #[test]
    fn test_terminal_states_never_move() {
        let mut o = order(OrderStatus::Approved);
        assert!(transition(&mut o, OrderStatus::Rejected).is_err());
        assert!(transition(&mut o, OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_reject_refunds_once() {
        let mut o = order(OrderStatus::Preparing);
        o.balance_used = 4.0;

        let outcome = transition(&mut o, OrderStatus::Rejected).unwrap();
        assert_eq!(outcome.effect(), Some(LifecycleEffect::RefundBalance { amount: 4.0 }));
        assert!(o.refunded);

        let mut replay = order(OrderStatus::Pending);
        replay.balance_used = 4.0;
        replay.refunded = true;
        let outcome = transition(&mut replay, OrderStatus::Rejected).unwrap();
        assert_eq!(outcome.effect(), None);
    }

    #[test]
    fn test_reject_without_wallet_has_no_effect() {
        let mut o = order(OrderStatus::Pending);
        let outcome = transition(&mut o, OrderStatus::Rejected).unwrap();
        assert_eq!(outcome.effect(), None);
        assert_eq!(o.status, OrderStatus::Rejected);
    }
}
