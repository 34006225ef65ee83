//! Sync events
//!
//! These events are used for:
//! - Refreshing views after a pull lands new data
//! - Telling other processes that the local cache changed
//! - Audit logging of unifier runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All events published on the sync bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEvent {
    MergeCompleted(MergeCompletedEvent),
    PushCompleted(PushCompletedEvent),
    AccountsUnified(AccountsUnifiedEvent),
    LocalChanged(LocalChangedEvent),
}

impl SyncEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MergeCompleted(_) => "MERGE_COMPLETED",
            Self::PushCompleted(_) => "PUSH_COMPLETED",
            Self::AccountsUnified(_) => "ACCOUNTS_UNIFIED",
            Self::LocalChanged(_) => "LOCAL_CHANGED",
        }
    }

    /// Get the event timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MergeCompleted(e) => e.at,
            Self::PushCompleted(e) => e.at,
            Self::AccountsUnified(e) => e.at,
            Self::LocalChanged(e) => e.at,
        }
    }

    pub fn merge_completed(accounts: usize, guest_orders: usize) -> Self {
        Self::MergeCompleted(MergeCompletedEvent {
            accounts,
            guest_orders,
            at: Utc::now(),
        })
    }

    pub fn push_completed(accounts: usize, guest_orders: usize) -> Self {
        Self::PushCompleted(PushCompletedEvent {
            accounts,
            guest_orders,
            at: Utc::now(),
        })
    }

    pub fn accounts_unified(groups_merged: usize, records_deleted: usize) -> Self {
        Self::AccountsUnified(AccountsUnifiedEvent {
            groups_merged,
            records_deleted,
            at: Utc::now(),
        })
    }

    pub fn local_changed(key: impl Into<String>) -> Self {
        Self::LocalChanged(LocalChangedEvent {
            key: key.into(),
            at: Utc::now(),
        })
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCompletedEvent {
    pub accounts: usize,
    pub guest_orders: usize,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushCompletedEvent {
    pub accounts: usize,
    pub guest_orders: usize,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsUnifiedEvent {
    pub groups_merged: usize,
    pub records_deleted: usize,
    pub at: DateTime<Utc>,
}

/// A local cache key was written by another process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalChangedEvent {
    pub key: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SyncEvent::merge_completed(3, 1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MERGE_COMPLETED");
        assert_eq!(json["accounts"], 3);

        let back: SyncEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "MERGE_COMPLETED");
    }

    #[test]
    fn test_local_changed_carries_key() {
        let event = SyncEvent::local_changed("loyalty:accounts");
        match &event {
            SyncEvent::LocalChanged(e) => assert_eq!(e.key, "loyalty:accounts"),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(event.timestamp() <= Utc::now());
    }
}
