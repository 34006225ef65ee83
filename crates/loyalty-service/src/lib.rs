//! # loyalty-service
//!
//! Application layer: the reconciliation engine, realtime sync, the duplicate
//! unifier and the loyalty use cases built on top of them.

pub mod dto;
pub mod services;

pub use services::{
    AccountService, DuplicateUnifier, OrderService, PrizeService, PullOptions, RealtimeSync,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, Session, SyncBus,
    SyncEngine, SyncError, SyncGuard, SyncResult,
};
