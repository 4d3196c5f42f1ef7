//! Execution coordinator
//!
//! Sends physical statements to their datasources.
//!
//! ```text
//!   1 statement            N statements
//!       │                       │
//!       ▼                       ▼
//!   run inline          spawn one task each ──► semaphore (max_concurrency)
//!       │                       │
//!       ▼                       ▼
//!   error = request        join_all, keep target order
//!   error                       │
//!                               ▼
//!                 any failure? ─Yes─► PartialShardFailure { failures, completed }
//! ```
//!
//! Every shard of a fan-out runs to completion before the outcome is
//! reported, so a partial failure lists every failed shard and carries
//! every successful result. A timed out shard is reported as failed and
//! its backend future is dropped, which cancels any local work. A request
//! already handed to a remote datasource keeps running there.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use shardline_core::{ExecutionConfig, ShardTopology};
use shardline_router_core::PhysicalStatement;

use crate::backend::{BackendRegistry, ShardBackend, ShardOutput, ShardResult};
use crate::error::{BackendError, ExecError, ExecResult, ShardFailure};

const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Point and scatter-gather executor
pub struct ExecutionCoordinator {
    registry: Arc<BackendRegistry>,
    max_concurrency: usize,
    scatter_timeout: Option<Duration>,
}

impl ExecutionCoordinator {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            scatter_timeout: None,
        }
    }

    pub fn from_config(registry: Arc<BackendRegistry>, config: &ExecutionConfig) -> Self {
        Self::new(registry)
            .with_max_concurrency(config.max_concurrency)
            .with_scatter_timeout(config.scatter_timeout_ms.map(Duration::from_millis))
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_scatter_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scatter_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Check that every datasource of the topology has a backend
    pub fn validate_topology(&self, topology: &ShardTopology) -> ExecResult<()> {
        let names = self.registry.names();
        topology.validate_datasources(&names)?;
        info!(datasources = names.len(), "Backends cover the shard topology");
        Ok(())
    }

    /// Execute statements, results in statement order
    pub async fn execute(&self, mut statements: Vec<PhysicalStatement>) -> ExecResult<Vec<ShardResult>> {
        if statements.len() > 1 {
            return self.scatter(statements).await;
        }
        match statements.pop() {
            Some(stmt) => Ok(vec![self.execute_point(stmt).await?]),
            None => Ok(Vec::new()),
        }
    }

    async fn execute_point(&self, stmt: PhysicalStatement) -> ExecResult<ShardResult> {
        let backend = self
            .registry
            .get(&stmt.target.datasource)
            .ok_or_else(|| unregistered(&stmt.target.datasource))?;

        let output = run(backend.as_ref(), &stmt, self.scatter_timeout).await?;
        debug!(shard = %stmt.target, "Point statement completed");

        Ok(ShardResult {
            target: stmt.target,
            output,
        })
    }

    async fn scatter(&self, statements: Vec<PhysicalStatement>) -> ExecResult<Vec<ShardResult>> {
        let shard_count = statements.len();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        debug!(shards = shard_count, max_concurrency = self.max_concurrency, "Scatter started");

        let (targets, handles): (Vec<_>, Vec<_>) = statements
            .into_iter()
            .map(|stmt| {
                let backend = self.registry.get(&stmt.target.datasource);
                let permits = permits.clone();
                let timeout = self.scatter_timeout;
                let target = stmt.target.clone();

                let handle = tokio::spawn(run_shard(backend, permits, stmt, timeout));
                (target, handle)
            })
            .unzip();

        let outcomes = join_all(handles).await;

        let mut completed = Vec::with_capacity(shard_count);
        let mut failures = Vec::new();
        for (position, (target, outcome)) in targets.into_iter().zip(outcomes).enumerate() {
            let result = outcome.unwrap_or_else(|e| {
                Err(BackendError::Statement {
                    target: target.to_string(),
                    reason: format!("shard task failed: {}", e),
                })
            });
            match result {
                Ok(output) => completed.push(ShardResult { target, output }),
                Err(cause) => {
                    warn!(position, shard = %target, error = %cause, "Shard failed");
                    failures.push(ShardFailure {
                        position,
                        target,
                        cause,
                    });
                }
            }
        }

        if failures.is_empty() {
            debug!(shards = shard_count, "Scatter completed");
            Ok(completed)
        } else {
            Err(ExecError::PartialShardFailure {
                failures,
                completed,
            })
        }
    }
}

async fn run_shard(
    backend: Option<Arc<dyn ShardBackend>>,
    permits: Arc<Semaphore>,
    stmt: PhysicalStatement,
    timeout: Option<Duration>,
) -> Result<ShardOutput, BackendError> {
    let backend = backend.ok_or_else(|| unregistered(&stmt.target.datasource))?;
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| BackendError::Unavailable {
            datasource: stmt.target.datasource.clone(),
            reason: "scatter aborted".to_string(),
        })?;
    run(backend.as_ref(), &stmt, timeout).await
}

fn unregistered(datasource: &str) -> BackendError {
    BackendError::Unavailable {
        datasource: datasource.to_string(),
        reason: "no backend registered".to_string(),
    }
}

/// Execute with an optional deadline; on expiry the backend future is dropped
async fn run(
    backend: &dyn ShardBackend,
    stmt: &PhysicalStatement,
    timeout: Option<Duration>,
) -> Result<ShardOutput, BackendError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, backend.execute(stmt))
            .await
            .map_err(|_| BackendError::Timeout {
                target: stmt.target.to_string(),
                timeout_ms: limit.as_millis() as u64,
            })?,
        None => backend.execute(stmt).await,
    }
}
