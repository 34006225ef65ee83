//! Account entity - a loyalty customer or an admin

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::Order;
use crate::value_objects::{normalize_email, AccountId, PhoneKey};

/// Account role
///
/// Soft-deleted accounts are not a role; they are represented by
/// [`AccountRecord::Deleted`](super::AccountRecord::Deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Customer
        }
    }
}

/// Loyalty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// Parse a tier name; anything unknown is Bronze
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "silver" | "plata" => Self::Silver,
            "gold" | "oro" => Self::Gold,
            _ => Self::Bronze,
        }
    }

    /// Rank used when two sides disagree; higher wins
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1,
            Self::Gold => 2,
        }
    }
}

impl From<String> for Tier {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        };
        f.write_str(name)
    }
}

/// Account entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Argon2 PHC string
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub wallet_balance: f64,
    #[serde(default)]
    pub lifetime_spent: f64,
    /// Legacy points balance
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub referral_code: String,
    #[serde(default)]
    pub referred_by: Option<String>,
    /// One-shot multiplier for the next purchase, set by a promotion
    #[serde(default)]
    pub next_purchase_multiplier: Option<f64>,
    #[serde(default)]
    pub last_draw_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Account {
    /// Create a new customer account with zeroed balances
    pub fn new(email: impl Into<String>, phone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(),
            email: email.into(),
            phone: phone.into(),
            name: name.into(),
            last_name: String::new(),
            birth_date: None,
            password_hash: String::new(),
            role: Role::Customer,
            wallet_balance: 0.0,
            lifetime_spent: 0.0,
            points: 0,
            tier: Tier::Bronze,
            referral_code: String::new(),
            referred_by: None,
            next_purchase_multiplier: None,
            last_draw_at: None,
            created_at: Utc::now(),
            orders: Vec::new(),
        }
    }

    /// Normalized email used as the merge key
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    /// Normalized phone used for deduplication and login
    pub fn phone_key(&self) -> PhoneKey {
        PhoneKey::new(&self.phone)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Display name with last name, if any
    pub fn full_name(&self) -> String {
        if self.last_name.trim().is_empty() {
            self.name.trim().to_string()
        } else {
            format!("{} {}", self.name.trim(), self.last_name.trim())
        }
    }

    /// Find an owned order by id
    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    /// Find an owned order by id, mutably
    pub fn order_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == order_id)
    }

    /// Add to the wallet
    pub fn credit_wallet(&mut self, amount: f64) {
        if amount > 0.0 {
            self.wallet_balance += amount;
        }
    }

    /// Take from the wallet; the balance never goes negative
    pub fn debit_wallet(&mut self, amount: f64) -> Result<(), crate::DomainError> {
        if amount <= 0.0 {
            return Ok(());
        }
        if amount > self.wallet_balance {
            return Err(crate::DomainError::InsufficientBalance {
                requested: amount,
                available: self.wallet_balance,
            });
        }
        self.wallet_balance = (self.wallet_balance - amount).max(0.0);
        Ok(())
    }
}
