//! # loyalty-worker
//!
//! Long-running sync process over PostgreSQL and Redis: an initial pull,
//! then realtime reconciliation driven by the change feed and by other
//! processes' local-change notifications. One-shot commands run a single
//! pull, push or unifier pass.

pub mod bridge;
pub mod command;
pub mod runner;

pub use command::{Command, Task};
pub use runner::{run, run_task, watch};
