//! Remote store ports
//!
//! The domain layer defines what it needs from the shared store, and the
//! infrastructure layer provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::UnboundedReceiver;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RepoResult;
use crate::entities::{Account, AccountRecord, Order, Prize, Settings, Tombstone};

/// Remote collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Accounts,
    Orders,
    Settings,
    Votes,
    Surveys,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Orders => "orders",
            Self::Settings => "settings",
            Self::Votes => "votes",
            Self::Surveys => "surveys",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accounts" => Some(Self::Accounts),
            "orders" => Some(Self::Orders),
            "settings" => Some(Self::Settings),
            "votes" => Some(Self::Votes),
            "surveys" => Some(Self::Surveys),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Notification that a remote collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
}

/// Receiver side of a change subscription; closes when the feed stops
pub type ChangeStream = UnboundedReceiver<ChangeEvent>;

/// Server answer to `process_order`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedOrder {
    pub order_id: String,
    /// Authoritative reward, replacing the local prediction
    pub reward: f64,
    pub wallet_balance: f64,
}

// ============================================================================
// Remote Store
// ============================================================================

/// Bulk read and upsert-by-id access to the shared collections
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All account rows, tombstones included
    async fn fetch_accounts(&self) -> RepoResult<Vec<AccountRecord>>;

    /// Orders placed without an account
    async fn fetch_guest_orders(&self) -> RepoResult<Vec<Order>>;

    async fn fetch_settings(&self) -> RepoResult<Option<Settings>>;

    async fn fetch_prize_catalog(&self) -> RepoResult<Option<Vec<Prize>>>;

    /// Insert or replace accounts by id
    async fn upsert_accounts(&self, accounts: &[Account]) -> RepoResult<()>;

    /// Replace an account row with its tombstone
    async fn upsert_tombstone(&self, tombstone: &Tombstone) -> RepoResult<()>;

    /// Insert or replace guest orders by id
    async fn upsert_guest_orders(&self, orders: &[Order]) -> RepoResult<()>;

    async fn upsert_settings(&self, settings: &Settings) -> RepoResult<()>;

    /// Hard delete by id
    async fn delete(&self, collection: Collection, id: &str) -> RepoResult<()>;
}

// ============================================================================
// Ledger Procedures
// ============================================================================

/// Server-side procedures; the only path that moves money
#[async_trait]
pub trait LedgerProcedures: Send + Sync {
    /// Create the account and apply the welcome bonus
    async fn register_account(&self, account: &Account) -> RepoResult<Account>;

    /// Record a checkout: debit the wallet amount and store the order with its reward
    async fn process_order(&self, email: &str, order: &Order) -> RepoResult<ProcessedOrder>;

    /// Credit the order's reward, lifetime spending and referrer bonus
    async fn approve_order(&self, order_id: &str) -> RepoResult<()>;

    /// Refund the wallet amount spent on the order, at most once
    async fn reject_order(&self, order_id: &str) -> RepoResult<()>;

    /// Take an amount from a wallet, returning the new balance
    async fn debit_wallet(&self, email: &str, amount: f64) -> RepoResult<f64>;

    /// Credit a prize and stamp the draw time
    async fn award_prize(&self, email: &str, prize: &Prize, at: DateTime<Utc>) -> RepoResult<Account>;
}

// ============================================================================
// Change Feed
// ============================================================================

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to changes of one collection. Delivery is at-least-once.
    async fn subscribe(&self, collection: Collection) -> RepoResult<ChangeStream>;
}
