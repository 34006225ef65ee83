//! Service layer error types
//!
//! [`SyncError`] covers the reconciliation engine; [`ServiceError`] is the
//! unified error of every use case.

use loyalty_common::AppError;
use loyalty_core::{DomainError, DrawRejected};
use std::fmt;

/// Reconciliation failure. Local state is never rolled back because of one.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote store could not be read or written
    #[error("Remote sync failed: {0}")]
    Remote(#[source] DomainError),

    /// The local cache could not be read or written
    #[error("Local cache failed: {0}")]
    Cache(#[source] DomainError),
}

impl SyncError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Remote(_) => "SYNC_REMOTE_ERROR",
            Self::Cache(_) => "SYNC_CACHE_ERROR",
        }
    }

    /// Underlying domain error
    pub fn inner(&self) -> &DomainError {
        match self {
            Self::Remote(e) | Self::Cache(e) => e,
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation
    Domain(DomainError),

    /// Application error (credentials, password policy, etc.)
    App(AppError),

    /// Pull or push failure
    Sync(SyncError),

    /// The account may not draw a prize right now
    DrawRejected(DrawRejected),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Validation error
    Validation(String),

    /// Conflict (e.g., duplicate email or phone)
    Conflict(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::Sync(e) => write!(f, "{e}"),
            Self::DrawRejected(DrawRejected::Admin) => {
                write!(f, "Admin accounts cannot take part in prize draws")
            }
            Self::DrawRejected(DrawRejected::Cooldown { next_eligible_at }) => {
                write!(f, "Next prize draw available at {next_eligible_at}")
            }
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            Self::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code for logs and client messages
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Sync(e) => e.error_code(),
            Self::DrawRejected(DrawRejected::Admin) => "ADMIN_CANNOT_DRAW",
            Self::DrawRejected(DrawRejected::Cooldown { .. }) => "DRAW_COOLDOWN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Failed because a store was unreachable; the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_transient(),
            Self::App(e) => e.is_retryable(),
            Self::Sync(_) => true,
            _ => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AdminCannotDraw => Self::DrawRejected(DrawRejected::Admin),
            DomainError::DrawCooldown { next_eligible_at } => {
                Self::DrawRejected(DrawRejected::Cooldown { next_eligible_at })
            }
            other => Self::Domain(other),
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<SyncError> for ServiceError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl From<DrawRejected> for ServiceError {
    fn from(err: DrawRejected) -> Self {
        Self::DrawRejected(err)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Sync(SyncError::Remote(e)) => AppError::Remote(e.to_string()),
            ServiceError::Sync(SyncError::Cache(e)) => AppError::Cache(e.to_string()),
            ServiceError::DrawRejected(rejected) => AppError::Domain(rejected.into()),
            ServiceError::NotFound { resource, id } => {
                AppError::NotFound(format!("{resource} {id}"))
            }
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_not_found_error() {
        let err = ServiceError::not_found("Order", "abc");
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains("Order not found: abc"));
    }

    #[test]
    fn test_cooldown_domain_error_becomes_draw_rejection() {
        let next_eligible_at = Utc::now();
        let err = ServiceError::from(DomainError::DrawCooldown { next_eligible_at });
        assert!(matches!(
            err,
            ServiceError::DrawRejected(DrawRejected::Cooldown { .. })
        ));
        assert_eq!(err.error_code(), "DRAW_COOLDOWN");
    }

    #[test]
    fn test_sync_errors_are_retryable() {
        let err = ServiceError::from(SyncError::Remote(DomainError::RemoteError("down".to_string())));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "SYNC_REMOTE_ERROR");
        assert!(!ServiceError::conflict("email").is_retryable());
    }

    #[test]
    fn test_convert_to_app_error() {
        let app_err: AppError = ServiceError::validation("bad phone").into();
        assert_eq!(app_err.error_code(), "VALIDATION_ERROR");

        let app_err: AppError = ServiceError::Sync(SyncError::Remote(DomainError::RemoteError(
            "timeout".to_string(),
        )))
        .into();
        assert!(app_err.is_retryable());
    }
}
