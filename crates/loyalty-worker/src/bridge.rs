//! Cross-process fanout between the in-process sync bus and Redis pub/sub

use futures::Stream;
use loyalty_cache::{Publisher, ReceivedMessage};
use loyalty_core::SyncEvent;
use loyalty_service::SyncBus;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Forward every bus event to Redis until the bus closes
pub fn spawn_forwarder(bus: &SyncBus, publisher: Publisher) -> JoinHandle<()> {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = publisher.publish(&event).await {
                        warn!(event_type = event.event_type(), error = %e, "Failed to publish sync event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Forwarder lagged behind the sync bus");
                }
                Err(RecvError::Closed) => {
                    debug!("Sync bus closed, forwarder stopping");
                    break;
                }
            }
        }
    })
}

/// Decoded events from a subscriber receiver; undecodable payloads are skipped
pub fn sync_events(
    rx: broadcast::Receiver<ReceivedMessage>,
) -> impl Stream<Item = SyncEvent> + Unpin {
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(ReceivedMessage {
                    event: Some(event), ..
                }) => return Some((event, rx)),
                Ok(message) => {
                    debug!(channel = %message.channel, "Skipping message without a sync event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use loyalty_cache::PubSubChannel;

    #[tokio::test]
    async fn test_sync_events_skips_garbage_and_ends_on_close() {
        let (tx, rx) = broadcast::channel(8);
        let events = sync_events(rx);

        tx.send(ReceivedMessage {
            channel: PubSubChannel::Sync,
            event: None,
            payload: "noise".to_string(),
        })
        .unwrap();
        tx.send(ReceivedMessage {
            channel: PubSubChannel::LocalChanged,
            event: Some(SyncEvent::local_changed("loyalty:accounts")),
            payload: String::new(),
        })
        .unwrap();
        drop(tx);

        let collected: Vec<SyncEvent> = events.collect().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].event_type(), "LOCAL_CHANGED");
    }
}
