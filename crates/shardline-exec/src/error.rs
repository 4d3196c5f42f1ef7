//! Error types for the execution layer

use thiserror::Error;

use shardline_core::CoreError;
use shardline_router_core::{RouteTarget, RouterError};

use crate::backend::ShardResult;

pub type ExecResult<T> = Result<T, ExecError>;

/// Failure reported by one datasource
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No connection could be obtained, or the datasource is down
    #[error("Datasource {datasource} unavailable: {reason}")]
    Unavailable { datasource: String, reason: String },

    /// The shard did not answer within the scatter timeout
    #[error("Shard {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    /// The datasource rejected the statement
    #[error("Statement failed on {target}: {reason}")]
    Statement { target: String, reason: String },
}

/// One failed shard of a multi-target execution
#[derive(Debug, Clone)]
pub struct ShardFailure {
    /// Position of the shard in target order
    pub position: usize,
    pub target: RouteTarget,
    pub cause: BackendError,
}

/// Execution errors
#[derive(Debug, Error)]
pub enum ExecError {
    /// Single-target execution failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// At least one shard of a fan-out failed; every shard ran to completion
    #[error("{} of {} shards failed", failures.len(), failures.len() + completed.len())]
    PartialShardFailure {
        failures: Vec<ShardFailure>,
        completed: Vec<ShardResult>,
    },

    /// Topology does not match the registered backends
    #[error(transparent)]
    Topology(#[from] CoreError),
}

impl ExecError {
    /// Positions of the failed shards, empty for non-fan-out errors
    pub fn failed_positions(&self) -> Vec<usize> {
        match self {
            ExecError::PartialShardFailure { failures, .. } => {
                failures.iter().map(|f| f.position).collect()
            }
            _ => Vec::new(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the sharding engine facade
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Routing failed: {0}")]
    Router(#[from] RouterError),

    #[error("Execution failed: {0}")]
    Exec(#[from] ExecError),
}
