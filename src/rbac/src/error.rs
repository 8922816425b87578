//! Error types for the RBAC resolver

use thiserror::Error;

/// RBAC resolver errors
///
/// Removing a link that does not exist is never an error; those operations
/// report zero removed rows instead.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Empty action, entity type, role name, subject or tenant id
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced ability or role is not in the store
    #[error("Not found: {0}")]
    NotFound(String),

    /// External store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;
