//! Store-wide settings document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar settings shared by every client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Bolivars per USD
    pub exchange_rate: f64,
    #[serde(default = "default_store_open")]
    pub store_open: bool,
    pub updated_at: DateTime<Utc>,
}

fn default_store_open() -> bool {
    true
}

impl Settings {
    pub fn new(exchange_rate: f64) -> Self {
        Self {
            exchange_rate,
            store_open: true,
            updated_at: Utc::now(),
        }
    }

    /// Convert a USD amount to bolivars at the current rate
    pub fn to_local_currency(&self, usd: f64) -> f64 {
        usd * self.exchange_rate
    }
}
