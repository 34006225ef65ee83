//! Snapshots - the synced collections handled as one unit

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::order::Order;
use super::prize::Prize;
use super::settings::Settings;
use super::tombstone::AccountRecord;
use crate::value_objects::normalize_email;

/// Local view of all synced collections
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub guest_orders: Vec<Order>,
    pub settings: Option<Settings>,
    pub prize_catalog: Vec<Prize>,
}

impl Snapshot {
    /// Find an account by email (case-insensitive)
    pub fn account(&self, email: &str) -> Option<&Account> {
        let key = normalize_email(email);
        self.accounts.iter().find(|a| a.email_key() == key)
    }

    /// Find an account by email, mutably
    pub fn account_mut(&mut self, email: &str) -> Option<&mut Account> {
        let key = normalize_email(email);
        self.accounts.iter_mut().find(|a| a.email_key() == key)
    }

    /// Find a guest order by id
    pub fn guest_order_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.guest_orders.iter_mut().find(|o| o.id == order_id)
    }

    /// Insert or replace an account by email key
    pub fn upsert_account(&mut self, account: Account) {
        match self.account_mut(&account.email) {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }
}

/// Remote view as fetched, tombstones included
#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    pub accounts: Vec<AccountRecord>,
    pub guest_orders: Vec<Order>,
    pub settings: Option<Settings>,
    pub prize_catalog: Option<Vec<Prize>>,
}

impl RemoteSnapshot {
    /// Remote view of a local snapshot, as if it had just been pushed
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            accounts: snapshot
                .accounts
                .iter()
                .cloned()
                .map(AccountRecord::Active)
                .collect(),
            guest_orders: snapshot.guest_orders.clone(),
            settings: snapshot.settings.clone(),
            prize_catalog: Some(snapshot.prize_catalog.clone()),
        }
    }

    /// Active accounts only
    pub fn active_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter_map(AccountRecord::as_active)
    }
}
