//! Error types for the router module

use thiserror::Error;

use crate::statement::Operation;

pub type RouterResult<T> = Result<T, RouterError>;

/// Router error types
#[derive(Debug, Error)]
pub enum RouterError {
    /// Sharding key is malformed, or the shard count is not positive
    #[error("Invalid sharding key: {0}")]
    InvalidKey(String),

    /// The statement lacks a key its operation needs
    #[error("Cannot route {operation} on {entity}: missing {missing}")]
    UnresolvableRoute {
        entity: String,
        operation: Operation,
        missing: String,
    },

    /// No sharding rule configured for the logical table
    #[error("No sharding rule for logical table: {0}")]
    UnknownEntity(String),
}
