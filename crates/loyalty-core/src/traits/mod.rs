//! Port traits - storage interfaces implemented by the infrastructure crates

mod local_store;
mod remote_store;

pub use local_store::LocalStore;
pub use remote_store::{
    ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Collection, LedgerProcedures,
    ProcessedOrder, RemoteStore,
};

use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;
