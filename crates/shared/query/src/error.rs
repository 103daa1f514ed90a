//! Query evaluation errors.

use thiserror::Error;

/// Errors raised while building or evaluating an expression tree.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The tree references an entity placeholder other than the one being bound
    #[error("unbound parameter it_{found} (expected it_{expected})")]
    UnboundParameter { expected: u64, found: u64 },

    /// A logical position held a non-boolean value
    #[error("expected a boolean, found {0}")]
    NotBoolean(String),

    /// Member access on something other than the entity or one of its fields
    #[error("member access on a computed value: {0}")]
    InvalidMemberBase(String),

    /// A call received the wrong number of arguments
    #[error("{method} expects {expected} argument(s), found {found}")]
    Arity {
        method: &'static str,
        expected: usize,
        found: usize,
    },

    /// An entity did not serialize to a JSON object
    #[error("entity did not serialize to a document")]
    NotADocument,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for query operations
pub type QueryResult<T> = Result<T, QueryError>;
