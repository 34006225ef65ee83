//! Business logic services
//!
//! The sync engine owns every write to the local cache; the use-case services
//! settle money through the ledger procedures and then mirror the result
//! locally.

pub mod account;
pub mod bus;
pub mod context;
pub mod error;
pub mod guard;
pub mod order;
pub mod prize;
pub mod realtime;
pub mod session;
pub mod sync;
pub mod unifier;

// Re-export all services for convenience
pub use account::AccountService;
pub use bus::SyncBus;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult, SyncError, SyncResult};
pub use guard::SyncGuard;
pub use order::OrderService;
pub use prize::PrizeService;
pub use realtime::RealtimeSync;
pub use session::Session;
pub use sync::{PullOptions, SyncEngine};
pub use unifier::DuplicateUnifier;
