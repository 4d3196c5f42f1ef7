//! Error types for configuration and topology

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Configuration and topology errors
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration source could not be read or parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sharding rules are inconsistent
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A datasource required by the topology is not configured
    #[error("Datasource not configured: {0}")]
    MissingDatasource(String),
}
