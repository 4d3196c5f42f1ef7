//! Sharding engine facade
//!
//! ```text
//! LogicalStatement ─► route ─► rewrite ─► execute ─► merge ─► MergedResult
//! ```

use std::sync::Arc;
use tracing::{debug, info};

use shardline_core::{ShardTopology, ShardingConfig};
use shardline_router_core::{
    IdGenerator, LogicalStatement, PhysicalStatement, RouteTargetSet, ShardRouter, StatementRewriter,
};

use crate::backend::BackendRegistry;
use crate::coordinator::ExecutionCoordinator;
use crate::error::{EngineError, EngineResult};
use crate::merger::{MergeMode, MergedResult, ResultMerger};

/// Routes, executes and merges logical statements
pub struct ShardingEngine {
    router: ShardRouter,
    rewriter: StatementRewriter,
    coordinator: ExecutionCoordinator,
    merger: ResultMerger,
}

impl ShardingEngine {
    pub fn new(router: ShardRouter, coordinator: ExecutionCoordinator) -> Self {
        Self {
            router,
            rewriter: StatementRewriter::new(),
            coordinator,
            merger: ResultMerger::new(),
        }
    }

    /// Build every component from a configuration
    ///
    /// Fails when the registry does not cover the topology's datasources.
    pub fn from_config(config: &ShardingConfig, registry: Arc<BackendRegistry>) -> EngineResult<Self> {
        let topology = Arc::new(
            ShardTopology::from_config(config).map_err(|e| EngineError::Exec(e.into()))?,
        );
        // Sequence starts cycle through every shard index
        let spread = u16::try_from(topology.max_shard_count().saturating_sub(1)).unwrap_or(u16::MAX);
        let vibration = config.id.max_vibration_offset.max(spread);
        let id_generator = Arc::new(IdGenerator::new(config.id.worker_id, vibration));
        let coordinator = ExecutionCoordinator::from_config(registry, &config.execution);
        coordinator.validate_topology(&topology)?;

        info!(
            datasources = topology.datasource_count(),
            worker_id = id_generator.worker_id(),
            max_vibration_offset = id_generator.max_vibration_offset(),
            "Sharding engine ready"
        );

        Ok(Self::new(ShardRouter::new(topology, id_generator), coordinator))
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn topology(&self) -> &Arc<ShardTopology> {
        self.router.topology()
    }

    pub fn id_generator(&self) -> &Arc<IdGenerator> {
        self.router.id_generator()
    }

    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    /// Route and rewrite without executing
    pub fn plan(&self, stmt: &mut LogicalStatement) -> EngineResult<(RouteTargetSet, Vec<PhysicalStatement>)> {
        let targets = self.router.route(stmt)?;
        let physical = self.rewriter.rewrite(stmt, &targets);
        Ok((targets, physical))
    }

    /// Execute a logical statement end to end
    pub async fn execute(&self, mut stmt: LogicalStatement) -> EngineResult<MergedResult> {
        let (targets, physical) = self.plan(&mut stmt)?;
        debug!(
            entity = %stmt.entity,
            operation = %stmt.operation,
            kind = %targets.kind(),
            shards = physical.len(),
            "Executing statement"
        );

        let results = self.coordinator.execute(physical).await?;

        let mode = MergeMode::for_operation(stmt.operation);
        // Single targets already applied the page on the shard
        let page = if targets.is_single() { None } else { stmt.page };
        let merged = self.merger.merge(results, mode, page);

        debug!(
            entity = %stmt.entity,
            operation = %stmt.operation,
            rows = merged.rows.len(),
            total = ?merged.total,
            "Statement completed"
        );
        Ok(merged)
    }
}
