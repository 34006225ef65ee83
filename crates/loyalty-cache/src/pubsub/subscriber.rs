//! Redis Pub/Sub subscriber.
//!
//! A background task owns the Redis connection, reconnects after failures and
//! fans decoded messages out over a broadcast channel.

use futures_util::StreamExt;
use loyalty_core::SyncEvent;
use parking_lot::Mutex;
use redis::Client;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::pubsub::PubSubChannel;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Subscriber task stopped")]
    ChannelClosed,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Message received from Pub/Sub
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub channel: PubSubChannel,
    /// Decoded event, when the payload is a valid `SyncEvent`
    pub event: Option<SyncEvent>,
    pub payload: String,
}

impl ReceivedMessage {
    fn decode(channel_name: &str, payload: String) -> Self {
        let event = match serde_json::from_str(&payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(channel = channel_name, error = %e, "Ignoring non-event payload");
                None
            }
        };

        Self {
            channel: PubSubChannel::parse(channel_name),
            event,
            payload,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub redis_url: String,
    /// Capacity of the fan-out broadcast channel
    pub broadcast_buffer: usize,
    pub reconnect_delay: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 256,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
enum Command {
    Subscribe(Vec<String>),
    Shutdown,
}

type ChannelSet = Arc<Mutex<BTreeSet<String>>>;

/// Redis Pub/Sub subscriber
pub struct Subscriber {
    channels: ChannelSet,
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    control_tx: mpsc::Sender<Command>,
}

impl Subscriber {
    /// Start the background listener
    pub fn spawn(config: SubscriberConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::channel(16);
        let channels: ChannelSet = Arc::default();

        tokio::spawn(listen(config, channels.clone(), broadcast_tx.clone(), control_rx));

        Self {
            channels,
            broadcast_tx,
            control_tx,
        }
    }

    pub async fn subscribe(&self, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        let names = channels.iter().map(|c| c.name().to_string()).collect();
        self.control_tx
            .send(Command::Subscribe(names))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Get a receiver for incoming messages
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.broadcast_tx.subscribe()
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        self.channels.lock().iter().cloned().collect()
    }

    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}

/// Reconnect loop around [`run_session`]
async fn listen(
    config: SubscriberConfig,
    channels: ChannelSet,
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    mut control_rx: mpsc::Receiver<Command>,
) {
    loop {
        match run_session(&config, &channels, &broadcast_tx, &mut control_rx).await {
            Ok(()) => {
                tracing::info!("Subscriber shutting down");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Subscriber connection lost, reconnecting");
                tokio::time::sleep(config.reconnect_delay).await;
            }
        }
    }
}

/// One connection lifetime; `Ok` means shutdown was requested
async fn run_session(
    config: &SubscriberConfig,
    channels: &ChannelSet,
    broadcast_tx: &broadcast::Sender<ReceivedMessage>,
    control_rx: &mut mpsc::Receiver<Command>,
) -> SubscriberResult<()> {
    let client = Client::open(config.redis_url.as_str())?;
    let mut pubsub = client.get_async_pubsub().await?;

    let known: Vec<String> = channels.lock().iter().cloned().collect();
    for name in &known {
        pubsub.subscribe(name).await?;
    }
    tracing::info!(channels = known.len(), "Subscriber connected to Redis");

    loop {
        let command = {
            let mut stream = pubsub.on_message();
            loop {
                tokio::select! {
                    msg = stream.next() => {
                        let Some(msg) = msg else {
                            tracing::warn!("Pub/Sub stream ended");
                            return Err(SubscriberError::ChannelClosed);
                        };
                        let payload: String = msg.get_payload().unwrap_or_default();
                        let received = ReceivedMessage::decode(msg.get_channel_name(), payload);
                        // No receivers is fine
                        let _ = broadcast_tx.send(received);
                    }
                    cmd = control_rx.recv() => break cmd,
                }
            }
        };

        match command {
            Some(Command::Subscribe(names)) => {
                for name in names {
                    pubsub.subscribe(&name).await?;
                    tracing::debug!(channel = %name, "Subscribed to channel");
                    channels.lock().insert(name);
                }
            }
            Some(Command::Shutdown) | None => return Ok(()),
        }
    }
}

/// Builder for subscriber
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: SubscriberConfig,
    initial_channels: Vec<PubSubChannel>,
}

impl SubscriberBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    pub fn subscribe(mut self, channel: PubSubChannel) -> Self {
        self.initial_channels.push(channel);
        self
    }

    /// Start the subscriber and queue the initial subscriptions
    pub async fn build(self) -> SubscriberResult<Subscriber> {
        let subscriber = Subscriber::spawn(self.config);
        if !self.initial_channels.is_empty() {
            subscriber.subscribe(&self.initial_channels).await?;
        }
        Ok(subscriber)
    }
}
