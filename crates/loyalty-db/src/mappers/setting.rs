//! Settings rows
//!
//! The settings table holds keyed singletons: the store settings document
//! and the prize catalog.

use serde::Serialize;

/// Key of the store settings document
pub const STORE_SETTINGS_KEY: &str = "store";
/// Key of the prize catalog
pub const PRIZE_CATALOG_KEY: &str = "prize_catalog";

/// Column values for a settings upsert
#[derive(Debug, Clone)]
pub struct SettingWrite {
    pub key: &'static str,
    pub value: serde_json::Value,
}

impl SettingWrite {
    pub fn new<T: Serialize>(key: &'static str, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key,
            value: serde_json::to_value(value)?,
        })
    }
}
