//! # loyalty-core
//!
//! Domain layer containing entities, value objects, ledger math, the order
//! lifecycle, merge primitives, and the port traits for remote and local storage.
//! This crate has zero dependencies on infrastructure (database, cache, runtime).

pub mod entities;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod reconcile;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    default_prize_catalog, Account, AccountRecord, Delivery, DeliveryMethod, GuestContact,
    LineItem, Order, OrderStatus, PaymentStatus, Prize, PrizeKind, RemoteSnapshot, Role,
    Settings, Snapshot, Tier, Tombstone,
};
pub use error::DomainError;
pub use events::SyncEvent;
pub use ledger::{DrawRejected, RewardPolicy};
pub use lifecycle::{LifecycleEffect, TransitionOutcome};
pub use reconcile::{MergeOptions, MergePolicy, SnapshotMerge, UnifiedGroup};
pub use traits::{
    ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Collection, LedgerProcedures, LocalStore,
    ProcessedOrder, RemoteStore, RepoResult,
};
pub use value_objects::{
    generate_referral_code, normalize_email, normalize_phone, AccountId, PhoneKey,
};
