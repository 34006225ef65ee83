//! # loyalty-cache
//!
//! Device-local persistence and cross-process sync notifications.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Local Stores**: `LocalStore` over Redis, or in memory for tests and offline runs
//! - **Local Cache**: Typed snapshot, session and sync-stamp access with tolerant parsing
//! - **Pub/Sub**: `SyncEvent` fan-out between processes sharing one cache
//!
//! ## Example
//!
//! ```ignore
//! use loyalty_cache::{LocalCache, RedisLocalStore, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let cache = LocalCache::new(Arc::new(RedisLocalStore::new(pool)));
//!
//! let snapshot = cache.load_snapshot().await?;
//! ```

pub mod local;
pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export local persistence types
pub use local::{keys, LocalCache, MemoryLocalStore, RedisLocalStore, SessionRecord};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig,
    SubscriberError, SubscriberResult, LOCAL_CHANGED_CHANNEL, SYNC_CHANNEL,
};
