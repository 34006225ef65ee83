//! Repository implementations
//!
//! PostgreSQL implementations of the remote store ports defined in
//! loyalty-core. Every procedure runs in one transaction and locks the
//! account rows it touches.

mod change_feed;
mod error;
mod procedures;
mod remote_store;
mod rows;

pub use change_feed::{PgChangeFeed, CHANGE_CHANNEL};
pub use procedures::{PgLedgerProcedures, ProcedureConfig};
pub use remote_store::PgRemoteStore;
