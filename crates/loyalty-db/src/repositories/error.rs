//! Error handling utilities for repositories

use loyalty_core::DomainError;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::RemoteError(e.to_string())
}

/// Convert a document (de)serialization failure to DomainError
pub fn map_document_error(e: serde_json::Error) -> DomainError {
    DomainError::RemoteError(format!("malformed document: {e}"))
}

/// Create an "account not found" error
pub fn account_not_found(email: &str) -> DomainError {
    DomainError::AccountNotFound(email.to_string())
}

/// Create an "order not found" error
pub fn order_not_found(order_id: &str) -> DomainError {
    DomainError::OrderNotFound(order_id.to_string())
}
