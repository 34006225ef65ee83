//! # loyalty-db
//!
//! Remote store implemented over PostgreSQL via SQLx, plus an in-process
//! store with the same semantics.
//!
//! ## Overview
//!
//! This crate provides the infrastructure behind the `loyalty-core` ports:
//!
//! - Connection pool management and embedded migrations
//! - Row models with SQLx `FromRow` derives
//! - Document ↔ row mappers
//! - [`PgRemoteStore`], [`PgLedgerProcedures`] and [`PgChangeFeed`]
//! - [`MemoryRemoteStore`], used by tests and offline tooling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use loyalty_db::pool::{create_pool, run_migrations, DatabaseConfig};
//! use loyalty_db::PgRemoteStore;
//! use loyalty_core::RemoteStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     let remote = PgRemoteStore::new(pool);
//!
//!     let accounts = remote.fetch_accounts().await?;
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryRemoteStore;
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgChangeFeed, PgLedgerProcedures, PgRemoteStore, ProcedureConfig, CHANGE_CHANNEL,
};
