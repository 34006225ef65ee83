//! Duplicate unification - folding accounts that share a phone number

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use super::merge::is_placeholder_name;
use crate::entities::{Account, Role, Tombstone};
use crate::ledger::tier_for_spending;
use crate::value_objects::PhoneKey;

const OWNER_MARKERS: [&str; 4] = ["admin", "administrador", "dueño", "owner"];

/// Master account plus one tombstone per folded victim
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedGroup {
    pub master: Account,
    pub tombstones: Vec<Tombstone>,
}

/// Whether a display name marks the store owner
pub fn looks_like_owner(name: &str) -> bool {
    let name = name.to_lowercase();
    OWNER_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Group accounts by normalized phone, keeping only real duplicates
pub fn group_by_phone<'a, I>(accounts: I) -> BTreeMap<PhoneKey, Vec<&'a Account>>
where
    I: IntoIterator<Item = &'a Account>,
{
    let mut groups: BTreeMap<PhoneKey, Vec<&'a Account>> = BTreeMap::new();
    for account in accounts {
        let key = account.phone_key();
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(account);
    }
    groups.retain(|_, members| members.len() >= 2);
    groups
}

/// Sort order for electing a master; the smallest element wins.
///
/// Admins first, then most orders, then most points, then the oldest account.
pub fn election_order(a: &Account, b: &Account) -> Ordering {
    b.is_admin()
        .cmp(&a.is_admin())
        .then_with(|| b.orders.len().cmp(&a.orders.len()))
        .then_with(|| b.points.cmp(&a.points))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn elect_master<'a>(members: &[&'a Account]) -> Option<&'a Account> {
    members.iter().copied().min_by(|a, b| election_order(a, b))
}

/// Fold a duplicate group into its elected master.
///
/// Returns `None` for groups with fewer than two members.
pub fn unify_group(members: &[&Account], now: DateTime<Utc>) -> Option<UnifiedGroup> {
    if members.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&Account> = members.to_vec();
    ordered.sort_by(|a, b| election_order(a, b));
    let (first, victims) = ordered.split_first()?;

    let mut master = (*first).clone();
    let owner_name = ordered.iter().find(|a| looks_like_owner(&a.name));

    for victim in victims {
        master.wallet_balance += victim.wallet_balance;
        master.lifetime_spent += victim.lifetime_spent;
        master.points += victim.points;

        if victim.is_admin() {
            master.role = Role::Admin;
        }
        master.tier = master.tier.max(victim.tier);
        master.last_draw_at = match (master.last_draw_at, victim.last_draw_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        if owner_name.is_none() && is_placeholder_name(&master.name) && !is_placeholder_name(&victim.name) {
            master.name = victim.name.clone();
        }
        if is_placeholder_name(&master.last_name) && !is_placeholder_name(&victim.last_name) {
            master.last_name = victim.last_name.clone();
        }
        if master.birth_date.is_none() {
            master.birth_date = victim.birth_date;
        }

        let known: HashSet<String> = master.orders.iter().map(|o| o.id.clone()).collect();
        master
            .orders
            .extend(victim.orders.iter().filter(|o| !known.contains(&o.id)).cloned());
    }

    if let Some(owner) = owner_name {
        master.name = owner.name.clone();
        if !is_placeholder_name(&owner.last_name) {
            master.last_name = owner.last_name.clone();
        }
    }

    master.tier = master.tier.max(tier_for_spending(master.lifetime_spent));
    master
        .orders
        .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let tombstones = victims
        .iter()
        .map(|victim| Tombstone::new(victim.id, Some(master.id), now))
        .collect();

    Some(UnifiedGroup { master, tombstones })
}
