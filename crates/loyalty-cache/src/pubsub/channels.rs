//! Pub/Sub channel definitions.

use loyalty_core::SyncEvent;

/// Channel for pull/push/unify notifications
pub const SYNC_CHANNEL: &str = "loyalty:sync";
/// Channel announcing that the shared local cache was written
pub const LOCAL_CHANGED_CHANNEL: &str = "loyalty:local_changed";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    Sync,
    LocalChanged,
    Custom(String),
}

impl PubSubChannel {
    /// Channel an event is published on
    pub fn for_event(event: &SyncEvent) -> Self {
        match event {
            SyncEvent::LocalChanged(_) => Self::LocalChanged,
            _ => Self::Sync,
        }
    }

    /// Get the Redis channel name
    pub fn name(&self) -> &str {
        match self {
            Self::Sync => SYNC_CHANNEL,
            Self::LocalChanged => LOCAL_CHANGED_CHANNEL,
            Self::Custom(name) => name,
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    pub fn parse(name: &str) -> Self {
        match name {
            SYNC_CHANNEL => Self::Sync,
            LOCAL_CHANGED_CHANNEL => Self::LocalChanged,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_parse_back() {
        for channel in [
            PubSubChannel::Sync,
            PubSubChannel::LocalChanged,
            PubSubChannel::Custom("loyalty:other".to_string()),
        ] {
            assert_eq!(PubSubChannel::parse(channel.name()), channel);
        }
    }

    #[test]
    fn test_event_routing() {
        assert_eq!(
            PubSubChannel::for_event(&SyncEvent::local_changed("loyalty:accounts")),
            PubSubChannel::LocalChanged
        );
        assert_eq!(
            PubSubChannel::for_event(&SyncEvent::merge_completed(1, 0)),
            PubSubChannel::Sync
        );
    }
}
