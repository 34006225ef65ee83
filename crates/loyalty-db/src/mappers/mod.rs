//! Document to row mappers
//!
//! - `TryFrom<Model>`: decode a stored document back into a domain value
//! - `*Write` structs: prepare a domain value for an upsert

mod account;
mod order;
mod setting;

pub use account::AccountWrite;
pub use order::OrderWrite;
pub use setting::{SettingWrite, PRIZE_CATALOG_KEY, STORE_SETTINGS_KEY};
