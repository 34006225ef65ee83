//! Integration test utilities for the loyalty sync engine
//!
//! Scenarios run the full service stack over the in-memory remote store and
//! the in-memory local store, so they need no running services.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
