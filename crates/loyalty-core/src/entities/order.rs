//! Order entity - a checkout owned by an account or placed by a guest

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order status
///
/// `pending → preparing → delivered → approved`, with `rejected` reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    #[serde(alias = "shipped")]
    Preparing,
    Delivered,
    Approved,
    Rejected,
}

impl OrderStatus {
    /// Precedence used when two copies of one order disagree; higher wins
    #[inline]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Pending | Self::Rejected => 0,
            Self::Preparing => 1,
            Self::Delivered => 2,
            Self::Approved => 3,
        }
    }

    /// Approved and rejected orders never move again
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Finalized from the customer's point of view (handed over or closed)
    #[inline]
    pub fn is_finalized(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Delivered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Delivered => "delivered",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// How the order reaches the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Pickup,
    Delivery,
}

/// Delivery method and its fee
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub method: DeliveryMethod,
    #[serde(rename = "fee_usd", default)]
    pub fee: f64,
}

impl Delivery {
    pub fn pickup() -> Self {
        Self::default()
    }

    pub fn delivery(fee: f64) -> Self {
        Self {
            method: DeliveryMethod::Delivery,
            fee: fee.max(0.0),
        }
    }
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    #[serde(rename = "price_usd")]
    pub unit_price: f64,
    /// Selected customization flags (extra cheese, no onion, ...)
    #[serde(default)]
    pub options: Vec<String>,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            options: Vec::new(),
        }
    }

    #[inline]
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// Contact details for orders placed without an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    pub phone: String,
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Owning account email; `None` for guest orders
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub guest: Option<GuestContact>,
    pub items: Vec<LineItem>,
    #[serde(rename = "total_usd")]
    pub total: f64,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Reward computed at creation; earned once the order is approved
    #[serde(rename = "reward_usd", default)]
    pub reward: f64,
    /// Wallet amount consumed at checkout
    #[serde(rename = "balanceUsed_usd", default)]
    pub balance_used: f64,
    /// The rejection refund has been mirrored locally
    #[serde(default)]
    pub refunded: bool,
    /// Stored locally while the order procedure was unreachable; the wallet
    /// debit is not settled on the server yet
    #[serde(default)]
    pub awaiting_confirmation: bool,
}

impl Order {
    /// Create a pending order with a fresh id
    pub fn new(items: Vec<LineItem>, delivery: Delivery, payment_method: impl Into<String>) -> Self {
        let subtotal: f64 = items.iter().map(LineItem::line_total).sum();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            owner_email: None,
            guest: None,
            total: subtotal + delivery.fee,
            items,
            delivery,
            payment_method: payment_method.into(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            reward: 0.0,
            balance_used: 0.0,
            refunded: false,
            awaiting_confirmation: false,
        }
    }

    /// Sum of line items, excluding delivery
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Time elapsed since creation
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    #[inline]
    pub fn is_guest(&self) -> bool {
        self.owner_email.is_none()
    }
}
