//! Domain errors - error types for the domain layer

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entities::OrderStatus;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Prize catalog is empty")]
    EmptyPrizeCatalog,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Insufficient wallet balance: requested {requested:.2}, available {available:.2}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Admin accounts cannot take part in prize draws")]
    AdminCannotDraw,

    #[error("Prize draw on cooldown until {next_eligible_at}")]
    DrawCooldown { next_eligible_at: DateTime<Utc> },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Email already in use")]
    EmailAlreadyExists,

    #[error("Phone number already in use")]
    PhoneAlreadyExists,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Remote store error: {0}")]
    RemoteError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for user-facing messages
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::AccountNotFound(_) => "UNKNOWN_ACCOUNT",
            Self::OrderNotFound(_) => "UNKNOWN_ORDER",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidPhone => "INVALID_PHONE",
            Self::EmptyPrizeCatalog => "EMPTY_PRIZE_CATALOG",

            // Business Rules
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AdminCannotDraw => "ADMIN_CANNOT_DRAW",
            Self::DrawCooldown { .. } => "DRAW_COOLDOWN",

            // Conflict
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::PhoneAlreadyExists => "PHONE_ALREADY_EXISTS",

            // Infrastructure
            Self::RemoteError(_) => "REMOTE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::OrderNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::InvalidPhone | Self::EmptyPrizeCatalog
        )
    }

    /// Check if this is a business-rule rejection the caller can show to a user
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InvalidTransition { .. }
                | Self::AdminCannotDraw
                | Self::DrawCooldown { .. }
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::EmailAlreadyExists | Self::PhoneAlreadyExists)
    }

    /// Check if this error came from the remote store or the local cache
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteError(_) | Self::CacheError(_))
    }
}
