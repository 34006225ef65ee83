//! Redis Pub/Sub publisher.

use loyalty_core::SyncEvent;
use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;

/// Publishes sync events as JSON
#[derive(Debug, Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event on its routed channel, returning the receiver count
    pub async fn publish(&self, event: &SyncEvent) -> RedisResult<u32> {
        self.publish_to(&PubSubChannel::for_event(event), event).await
    }

    pub async fn publish_to(&self, channel: &PubSubChannel, event: &SyncEvent) -> RedisResult<u32> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(channel.name(), &payload).await?;

        tracing::debug!(
            channel = %channel,
            event_type = event.event_type(),
            receivers,
            "Published sync event"
        );

        Ok(receivers)
    }
}
