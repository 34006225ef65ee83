//! Redis Pub/Sub module.
//!
//! Carries [`SyncEvent`](loyalty_core::SyncEvent)s between processes that
//! share one local cache.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, LOCAL_CHANGED_CHANNEL, SYNC_CHANNEL};
pub use publisher::Publisher;
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
