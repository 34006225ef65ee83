//! Keyed settings database model

use sqlx::types::Json;
use sqlx::FromRow;

/// Database model for the settings table
#[derive(Debug, Clone, FromRow)]
pub struct SettingModel {
    pub key: String,
    pub value: Json<serde_json::Value>,
}
