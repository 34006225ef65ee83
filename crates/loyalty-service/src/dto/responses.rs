//! Report DTOs
//!
//! All reports implement `Serialize` so the worker can log them as JSON.

use chrono::{DateTime, Utc};
use loyalty_core::Prize;
use serde::Serialize;

// ============================================================================
// Sync Reports
// ============================================================================

/// Outcome of a pull
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub accounts: usize,
    pub guest_orders: usize,
    /// Stale orders left out of the merge
    pub orders_dropped: usize,
    /// Local-only or tombstoned accounts removed
    pub accounts_removed: usize,
}

/// Outcome of a push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub accounts: usize,
    pub guest_orders: usize,
    pub settings: bool,
}

/// Outcome of a unifier run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnifyReport {
    pub groups_merged: usize,
    pub records_deleted: usize,
    pub groups_failed: usize,
}

// ============================================================================
// Loyalty Results
// ============================================================================

/// Result of a prize draw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOutcome {
    pub prize: Prize,
    pub won: bool,
    pub points: i64,
    pub wallet_balance: f64,
    pub next_eligible_at: Option<DateTime<Utc>>,
}

/// Result of a checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    /// Server reward when confirmed, local prediction otherwise
    pub reward: f64,
    pub wallet_balance: f64,
    /// The order procedure accepted the order
    pub confirmed: bool,
}
