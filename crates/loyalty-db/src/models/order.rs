//! Guest order database model

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database model for the orders table
#[derive(Debug, Clone, FromRow)]
pub struct OrderModel {
    pub id: String,
    pub doc: Json<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}
