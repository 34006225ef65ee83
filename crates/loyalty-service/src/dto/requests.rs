//! Request DTOs
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use chrono::NaiveDate;
use loyalty_core::{DeliveryMethod, LineItem};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimum number of digits in a usable phone number
pub const MIN_PHONE_DIGITS: usize = 7;

// ============================================================================
// Account Requests
// ============================================================================

/// Account registration request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 7, max = 32, message = "Phone must be 7-32 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "Last name must be at most 64 characters"))]
    pub last_name: String,

    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    #[validate(length(min = 8, max = 72, message = "Password must be 8-72 characters"))]
    pub password: String,

    /// Referral code of the account that invited this one
    #[serde(default)]
    pub referred_by: Option<String>,
}

impl RegisterAccountRequest {
    /// Digits in the phone field, ignoring separators
    pub fn phone_digits(&self) -> usize {
        self.phone.chars().filter(char::is_ascii_digit).count()
    }
}

/// Login request; the identifier is an email or a phone number
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email or phone is required"))]
    pub identifier: String,

    pub password: String,
}

// ============================================================================
// Order Requests
// ============================================================================

/// One cart line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[validate(length(min = 1, max = 100, message = "Item name must be 1-100 characters"))]
    pub name: String,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub unit_price_usd: f64,

    #[serde(default)]
    pub options: Vec<String>,
}

impl From<&CheckoutItem> for LineItem {
    fn from(item: &CheckoutItem) -> Self {
        Self {
            name: item.name.trim().to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price_usd,
            options: item.options.clone(),
        }
    }
}

/// Checkout of the signed-in account's cart
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Cart is empty"), nested)]
    pub items: Vec<CheckoutItem>,

    #[serde(default)]
    pub delivery: DeliveryMethod,

    #[validate(length(min = 1, max = 32, message = "Payment method is required"))]
    pub payment_method: String,

    /// Wallet amount to spend on this order
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Wallet amount cannot be negative"))]
    pub wallet_amount_usd: f64,
}

/// Checkout without an account
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestCheckoutRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    #[validate(length(min = 7, max = 32, message = "Phone must be 7-32 characters"))]
    pub phone: String,

    #[validate(length(min = 1, message = "Cart is empty"), nested)]
    pub items: Vec<CheckoutItem>,

    #[serde(default)]
    pub delivery: DeliveryMethod,

    #[validate(length(min = 1, max = 32, message = "Payment method is required"))]
    pub payment_method: String,
}
