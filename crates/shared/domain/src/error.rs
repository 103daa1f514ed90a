//! Domain-level errors.
//!
//! These errors are independent of infrastructure concerns (drivers, network).

use thiserror::Error;

/// Domain-specific errors.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// A textual identifier was not 24 hex characters
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    /// Create an invalid identifier error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        DomainError::InvalidId(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
