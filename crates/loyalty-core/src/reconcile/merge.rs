//! Field-level merge of local and remote snapshots

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::entities::{
    default_prize_catalog, Account, AccountRecord, Order, RemoteSnapshot, Role, Settings, Snapshot,
};
use crate::value_objects::AccountId;

/// Names that carry no identity and lose to any real name
const PLACEHOLDER_NAMES: [&str; 4] = ["cliente", "cliente nuevo", "invitado", "sin nombre"];

/// Age limits applied to orders present on one side only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Local-only orders younger than this survive whatever their status
    pub local_grace: Duration,
    /// Finalized remote-only orders older than this are not adopted
    pub remote_history: Duration,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            local_grace: Duration::minutes(15),
            remote_history: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Drop local accounts the remote does not know about
    pub force_clean: bool,
}

/// Merged order list and the number of stale orders left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersMerge {
    pub orders: Vec<Order>,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountsMerge {
    pub accounts: Vec<Account>,
    /// Local-only accounts removed by `force_clean` or a remote tombstone
    pub removed: usize,
    pub orders_dropped: usize,
}

/// Result of merging a whole snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotMerge {
    pub snapshot: Snapshot,
    pub accounts_removed: usize,
    pub orders_dropped: usize,
}

/// True for blank or generic names such as "Cliente" or "Invitado"
pub fn is_placeholder_name(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    name.is_empty() || PLACEHOLDER_NAMES.contains(&name.as_str())
}

fn pick_name(local: &str, remote: &str) -> String {
    if is_placeholder_name(remote) && !is_placeholder_name(local) {
        local.to_string()
    } else {
        remote.to_string()
    }
}

fn non_empty_or(remote: &str, local: &str) -> String {
    if remote.trim().is_empty() {
        local.to_string()
    } else {
        remote.to_string()
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn sort_orders(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Merge two order lists by id.
///
/// Orders on both sides keep the copy with the higher status precedence,
/// remote on ties. One-sided orders are filtered by age per [`MergePolicy`].
pub fn merge_orders(
    local: &[Order],
    remote: &[Order],
    policy: &MergePolicy,
    now: DateTime<Utc>,
) -> OrdersMerge {
    let local_by_id: HashMap<&str, &Order> = local.iter().map(|o| (o.id.as_str(), o)).collect();
    let remote_ids: HashSet<&str> = remote.iter().map(|o| o.id.as_str()).collect();

    let mut orders = Vec::with_capacity(local.len().max(remote.len()));
    let mut dropped = 0;

    for remote_order in remote {
        match local_by_id.get(remote_order.id.as_str()) {
            Some(local_order)
                if local_order.status.precedence() > remote_order.status.precedence() =>
            {
                orders.push((*local_order).clone());
            }
            Some(_) => orders.push(remote_order.clone()),
            None => {
                let stale = remote_order.status.is_finalized()
                    && remote_order.age(now) > policy.remote_history;
                if stale {
                    dropped += 1;
                } else {
                    orders.push(remote_order.clone());
                }
            }
        }
    }

    for local_order in local.iter().filter(|o| !remote_ids.contains(o.id.as_str())) {
        let keep =
            local_order.age(now) < policy.local_grace || !local_order.status.is_terminal();
        if keep {
            orders.push(local_order.clone());
        } else {
            dropped += 1;
        }
    }

    sort_orders(&mut orders);
    OrdersMerge { orders, dropped }
}

fn merge_account_counted(
    local: &Account,
    remote: &Account,
    policy: &MergePolicy,
    now: DateTime<Utc>,
) -> (Account, usize) {
    let OrdersMerge { orders, dropped } = merge_orders(&local.orders, &remote.orders, policy, now);

    let role = if local.is_admin() || remote.is_admin() {
        Role::Admin
    } else {
        Role::Customer
    };

    let account = Account {
        id: remote.id,
        email: remote.email.clone(),
        phone: non_empty_or(&remote.phone, &local.phone),
        name: pick_name(&local.name, &remote.name),
        last_name: pick_name(&local.last_name, &remote.last_name),
        birth_date: remote.birth_date.or(local.birth_date),
        password_hash: non_empty_or(&remote.password_hash, &local.password_hash),
        role,
        wallet_balance: local.wallet_balance.max(remote.wallet_balance),
        lifetime_spent: local.lifetime_spent.max(remote.lifetime_spent),
        points: local.points.max(remote.points),
        tier: local.tier.max(remote.tier),
        referral_code: non_empty_or(&remote.referral_code, &local.referral_code),
        referred_by: remote.referred_by.clone().or_else(|| local.referred_by.clone()),
        next_purchase_multiplier: remote.next_purchase_multiplier,
        last_draw_at: latest(local.last_draw_at, remote.last_draw_at),
        created_at: local.created_at.min(remote.created_at),
        orders,
    };

    (account, dropped)
}

/// Merge one account present on both sides
pub fn merge_account(
    local: &Account,
    remote: &Account,
    policy: &MergePolicy,
    now: DateTime<Utc>,
) -> Account {
    merge_account_counted(local, remote, policy, now).0
}

/// Keep the first account for each normalized email
pub fn dedupe_by_email(accounts: Vec<Account>) -> Vec<Account> {
    let mut seen = HashSet::new();
    accounts
        .into_iter()
        .filter(|account| seen.insert(account.email_key()))
        .collect()
}

/// Merge local accounts against the remote collection
pub fn merge_accounts(
    local: &[Account],
    remote: &[AccountRecord],
    policy: &MergePolicy,
    options: MergeOptions,
    now: DateTime<Utc>,
) -> AccountsMerge {
    let tombstoned: HashSet<AccountId> = remote
        .iter()
        .filter(|record| record.is_deleted())
        .map(AccountRecord::id)
        .collect();

    let mut local_by_email: HashMap<String, &Account> = HashMap::with_capacity(local.len());
    for account in local {
        local_by_email.entry(account.email_key()).or_insert(account);
    }

    let mut result = AccountsMerge::default();
    let mut matched = HashSet::new();

    for remote_account in remote.iter().filter_map(AccountRecord::as_active) {
        let key = remote_account.email_key();
        match local_by_email.get(&key) {
            Some(local_account) => {
                let (merged, dropped) = merge_account_counted(local_account, remote_account, policy, now);
                result.orders_dropped += dropped;
                result.accounts.push(merged);
            }
            None => result.accounts.push(remote_account.clone()),
        }
        matched.insert(key);
    }

    for local_account in local {
        if matched.contains(&local_account.email_key()) {
            continue;
        }
        if options.force_clean || tombstoned.contains(&local_account.id) {
            result.removed += 1;
            continue;
        }
        result.accounts.push(local_account.clone());
    }

    result.accounts = dedupe_by_email(result.accounts);
    result
}

/// Remote settings win whenever they exist
pub fn merge_settings(local: Option<&Settings>, remote: Option<&Settings>) -> Option<Settings> {
    remote.or(local).cloned()
}

/// Merge a full local snapshot with a fetched remote one
pub fn merge_snapshot(
    local: &Snapshot,
    remote: &RemoteSnapshot,
    policy: &MergePolicy,
    options: MergeOptions,
    now: DateTime<Utc>,
) -> SnapshotMerge {
    let accounts = merge_accounts(&local.accounts, &remote.accounts, policy, options, now);
    let guest_orders = merge_orders(&local.guest_orders, &remote.guest_orders, policy, now);

    let prize_catalog = match &remote.prize_catalog {
        Some(catalog) if !catalog.is_empty() => catalog.clone(),
        _ if !local.prize_catalog.is_empty() => local.prize_catalog.clone(),
        _ => default_prize_catalog(),
    };

    SnapshotMerge {
        snapshot: Snapshot {
            accounts: accounts.accounts,
            guest_orders: guest_orders.orders,
            settings: merge_settings(local.settings.as_ref(), remote.settings.as_ref()),
            prize_catalog,
        },
        accounts_removed: accounts.removed,
        orders_dropped: accounts.orders_dropped + guest_orders.dropped,
    }
}
