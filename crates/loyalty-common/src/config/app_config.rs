//! Application configuration structs
//!
//! Loads configuration from a `.env` file and environment variables.

use chrono::Duration;
use loyalty_core::{MergePolicy, RewardPolicy};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub loyalty: LoyaltyConfig,
    pub sync: SyncConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Loyalty program parameters
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    #[serde(default = "default_founder_code")]
    pub founder_code: String,
    #[serde(default = "default_founder_window_days")]
    pub founder_window_days: i64,
    #[serde(default = "default_prize_cooldown_days")]
    pub prize_cooldown_days: i64,
    /// Wallet credit granted by `register_account`
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus_usd: f64,
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee_usd: f64,
}

impl LoyaltyConfig {
    pub fn reward_policy(&self) -> RewardPolicy {
        RewardPolicy {
            founder_code: self.founder_code.clone(),
            founder_window_days: self.founder_window_days,
        }
    }
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            founder_code: default_founder_code(),
            founder_window_days: default_founder_window_days(),
            prize_cooldown_days: default_prize_cooldown_days(),
            welcome_bonus_usd: default_welcome_bonus(),
            delivery_fee_usd: default_delivery_fee(),
        }
    }
}

/// Reconciliation timing
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Minimum gap between two triggers on the same channel
    #[serde(default = "default_sync_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_local_order_grace_minutes")]
    pub local_order_grace_minutes: i64,
    #[serde(default = "default_remote_order_history_hours")]
    pub remote_order_history_hours: i64,
}

impl SyncConfig {
    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cooldown_ms)
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            local_grace: Duration::minutes(self.local_order_grace_minutes),
            remote_history: Duration::hours(self.remote_order_history_hours),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_sync_cooldown_ms(),
            local_order_grace_minutes: default_local_order_grace_minutes(),
            remote_order_history_hours: default_remote_order_history_hours(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "loyalty-sync".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_founder_code() -> String {
    "FOUNDER".to_string()
}

fn default_founder_window_days() -> i64 {
    30
}

fn default_prize_cooldown_days() -> i64 {
    7
}

fn default_welcome_bonus() -> f64 {
    1.0
}

fn default_delivery_fee() -> f64 {
    2.0
}

fn default_sync_cooldown_ms() -> u64 {
    2000
}

fn default_local_order_grace_minutes() -> i64 {
    15
}

fn default_remote_order_history_hours() -> i64 {
    24
}

/// Read an optional variable, failing only when it is set but unparsable
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or a
    /// numeric variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: required_var("DATABASE_URL")?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            },
            redis: RedisConfig {
                url: required_var("REDIS_URL")?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            loyalty: LoyaltyConfig {
                founder_code: env::var("FOUNDER_CODE").unwrap_or_else(|_| default_founder_code()),
                founder_window_days: parse_var("FOUNDER_WINDOW_DAYS")?
                    .unwrap_or_else(default_founder_window_days),
                prize_cooldown_days: parse_var("PRIZE_COOLDOWN_DAYS")?
                    .unwrap_or_else(default_prize_cooldown_days),
                welcome_bonus_usd: parse_var("WELCOME_BONUS_USD")?
                    .unwrap_or_else(default_welcome_bonus),
                delivery_fee_usd: parse_var("DELIVERY_FEE_USD")?
                    .unwrap_or_else(default_delivery_fee),
            },
            sync: SyncConfig {
                cooldown_ms: parse_var("SYNC_COOLDOWN_MS")?.unwrap_or_else(default_sync_cooldown_ms),
                local_order_grace_minutes: parse_var("LOCAL_ORDER_GRACE_MINUTES")?
                    .unwrap_or_else(default_local_order_grace_minutes),
                remote_order_history_hours: parse_var("REMOTE_ORDER_HISTORY_HOURS")?
                    .unwrap_or_else(default_remote_order_history_hours),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
