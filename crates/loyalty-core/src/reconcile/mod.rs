//! Reconciliation - merging local and remote copies, and folding duplicates
//!
//! Merging is last-pull-wins at the collection level with field-level rules
//! for accounts and status precedence for orders. Every function is pure; the
//! service layer owns fetching, locking and persistence.

mod merge;
mod unify;

pub use merge::{
    dedupe_by_email, is_placeholder_name, merge_account, merge_accounts, merge_orders,
    merge_settings, merge_snapshot, AccountsMerge, MergeOptions, MergePolicy, OrdersMerge,
    SnapshotMerge,
};
pub use unify::{elect_master, election_order, group_by_phone, looks_like_owner, unify_group, UnifiedGroup};
