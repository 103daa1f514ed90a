//! Unified error handling for store operations.
//!
//! Not-found is never an error: lookups return `Option`/empty vectors.
//! Everything below propagates unchanged from the store to the caller.

use domain::DomainError;
use query::QueryError;
use thiserror::Error;

/// Store operation errors.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    // Setup
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Connectivity
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // Request errors
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Identifier is immutable: {0}")]
    ImmutableId(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Caller
    #[error("Operation cancelled")]
    Cancelled,

    // Internal
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Configuration(_) => "CONFIGURATION_ERROR",
            StoreError::Unavailable(_) => "UNAVAILABLE",
            StoreError::Timeout(_) => "TIMEOUT",
            StoreError::InvalidFilter(_) => "INVALID_FILTER",
            StoreError::InvalidUpdate(_) => "INVALID_UPDATE",
            StoreError::ImmutableId(_) => "IMMUTABLE_ID",
            StoreError::DuplicateId(_) => "DUPLICATE_ID",
            StoreError::InvalidId(_) => "INVALID_ID",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::Cancelled => "CANCELLED",
            StoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Connectivity failures that a reconnect may cure
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<QueryError> for StoreError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Serialization(e) => StoreError::Serialization(e.to_string()),
            QueryError::NotADocument => StoreError::Serialization(err.to_string()),
            other => StoreError::InvalidFilter(other.to_string()),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidId(msg) => StoreError::InvalidId(msg),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience constructors
impl StoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        StoreError::Configuration(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::Unavailable(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        StoreError::Timeout(msg.into())
    }

    pub fn invalid_update(msg: impl Into<String>) -> Self {
        StoreError::InvalidUpdate(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        StoreError::Internal(msg.into())
    }
}
