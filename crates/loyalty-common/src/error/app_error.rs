//! Application error types
//!
//! Errors raised outside the domain layer: credentials, configuration and
//! infrastructure failures, plus wrapped domain errors.

use loyalty_core::DomainError;
use serde::Serialize;
use std::fmt;

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Infrastructure errors
    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Stable error code for logs and client messages
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Remote(_) => "REMOTE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Caused by the caller's input rather than by the system
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidCredentials
            | Self::Validation(_)
            | Self::NotFound(_)
            | Self::Conflict(_) => true,
            Self::Domain(e) => {
                e.is_not_found() || e.is_validation() || e.is_conflict() || e.is_business_rule()
            }
            Self::Remote(_) | Self::Cache(_) | Self::Internal(_) | Self::Config(_) => false,
        }
    }

    /// Worth retrying later with the same input
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(_) | Self::Cache(_) => true,
            Self::Domain(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::NotFound(resource.to_string())
    }

    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Serializable error body for logs and client messages
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let details = match err {
            AppError::Domain(DomainError::DrawCooldown { next_eligible_at }) => {
                Some(serde_json::json!({ "nextEligibleAt": next_eligible_at }))
            }
            AppError::Domain(DomainError::InsufficientBalance {
                requested,
                available,
            }) => Some(serde_json::json!({ "requested": requested, "available": available })),
            _ => None,
        };

        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
