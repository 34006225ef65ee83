//! Sync events - notifications emitted by the reconciliation engine

mod sync_event;

pub use sync_event::{
    AccountsUnifiedEvent, LocalChangedEvent, MergeCompletedEvent, PushCompletedEvent, SyncEvent,
};
