//! Device-local persistence
//!
//! [`LocalStore`](loyalty_core::LocalStore) implementations plus the typed
//! [`LocalCache`] facade the services use.

mod cache;
mod memory_store;
mod redis_store;

pub use cache::{LocalCache, SessionRecord};
pub use memory_store::MemoryLocalStore;
pub use redis_store::RedisLocalStore;

/// Keys owned by the local cache
pub mod keys {
    pub const ACCOUNTS: &str = "loyalty:accounts";
    pub const GUEST_ORDERS: &str = "loyalty:guest_orders";
    pub const SETTINGS: &str = "loyalty:settings";
    pub const PRIZE_CATALOG: &str = "loyalty:prize_catalog";
    pub const LAST_SYNC: &str = "loyalty:last_sync";
    pub const SESSION: &str = "loyalty:session";

    /// Namespace prefix shared by every key above
    pub const PREFIX: &str = "loyalty:";
}
