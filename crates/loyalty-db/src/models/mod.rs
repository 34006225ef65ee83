//! Database models - SQLx-compatible structs for PostgreSQL tables

mod account;
mod order;
mod setting;

pub use account::AccountModel;
pub use order::OrderModel;
pub use setting::SettingModel;
