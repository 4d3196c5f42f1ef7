//! Shard Router
//!
//! Resolves a logical statement to the physical (datasource, table) pairs
//! that must execute it.
//!
//! # Routing Decision Tree
//!
//! ```text
//! Statement arrives
//!        │
//!        ▼
//! Insert without generated key? ──Yes──► IdGenerator assigns one
//!        │
//!        ▼
//! Datasource key bound? ─┬─Yes─► Table key bound? ─┬─Yes─► Point
//!                        │                         └─No──► every table of ds{i}
//!                        └─No──► Table key bound? ─┬─Yes─► table j of every ds
//!                                                  └─No──► full broadcast N×M
//! ```
//!
//! Inserts must resolve to a point route, and statements addressing one row
//! by primary key must carry that key; anything else is a contract
//! violation reported as `UnresolvableRoute`.

use std::sync::Arc;
use tracing::debug;

use shardline_core::{ShardAlgorithm, ShardTopology, TableRule};
use shardline_types::{Row, ShardKey};

use crate::error::{RouterError, RouterResult};
use crate::id_gen::IdGenerator;
use crate::statement::LogicalStatement;
use crate::strategy::strategy_for;
use crate::types::{RouteKind, RouteTargetSet};

/// Router combining the topology, sharding strategies and the id generator
pub struct ShardRouter {
    topology: Arc<ShardTopology>,
    id_generator: Arc<IdGenerator>,
}

impl ShardRouter {
    pub fn new(topology: Arc<ShardTopology>, id_generator: Arc<IdGenerator>) -> Self {
        Self {
            topology,
            id_generator,
        }
    }

    pub fn topology(&self) -> &Arc<ShardTopology> {
        &self.topology
    }

    pub fn id_generator(&self) -> &Arc<IdGenerator> {
        &self.id_generator
    }

    /// Assign missing generated keys, then resolve
    pub fn route(&self, stmt: &mut LogicalStatement) -> RouterResult<RouteTargetSet> {
        self.assign_generated_key(stmt)?;
        self.resolve(stmt)
    }

    /// Fill the entity's generated key on inserts that do not carry one
    ///
    /// Returns the assigned id, if any.
    pub fn assign_generated_key(&self, stmt: &mut LogicalStatement) -> RouterResult<Option<i64>> {
        if !stmt.operation.requires_point_route() {
            return Ok(None);
        }

        let rule = self.rule(stmt)?;
        let Some(column) = rule.generated_key.as_deref() else {
            return Ok(None);
        };
        if stmt.params.has(column) {
            return Ok(None);
        }

        let id = self.id_generator.next_id(stmt.entity.name());
        stmt.params.set(column, id);
        debug!(entity = %stmt.entity, column = %column, id, "Generated key assigned");
        Ok(Some(id))
    }

    /// Resolve the targets of a statement without modifying it
    pub fn resolve(&self, stmt: &LogicalStatement) -> RouterResult<RouteTargetSet> {
        let rule = self.rule(stmt)?;
        self.check_required_keys(stmt, rule)?;

        let datasource_count = self.topology.datasource_count();
        let table_count = rule.table_shard_count;

        let datasource = Self::key_index(
            &stmt.params,
            &rule.datasource_key,
            rule.datasource_algorithm,
            datasource_count,
        )?;
        let table = if rule.is_table_sharded() {
            Self::key_index(&stmt.params, &rule.table_key, rule.table_algorithm, table_count)?
        } else {
            Some(0)
        };

        let kind = match (datasource, table) {
            (Some(_), Some(_)) => RouteKind::Point,
            (Some(_), None) => RouteKind::DatasourceScoped,
            (None, Some(_)) if rule.is_table_sharded() => RouteKind::TableScoped,
            (None, _) => RouteKind::Broadcast,
        };

        let datasources: Vec<u32> = match datasource {
            Some(ds) => vec![ds],
            None => (0..datasource_count).collect(),
        };
        let tables: Vec<u32> = match table {
            Some(t) => vec![t],
            None => (0..table_count).collect(),
        };

        let targets = RouteTargetSet::cross_product(kind, stmt.entity, &datasources, &tables);

        debug!(
            entity = %stmt.entity,
            operation = %stmt.operation,
            kind = %kind,
            targets = targets.len(),
            "Statement routed"
        );

        Ok(targets)
    }

    fn rule(&self, stmt: &LogicalStatement) -> RouterResult<&TableRule> {
        self.topology
            .rule(stmt.entity)
            .ok_or_else(|| RouterError::UnknownEntity(stmt.entity.name().to_string()))
    }

    fn check_required_keys(&self, stmt: &LogicalStatement, rule: &TableRule) -> RouterResult<()> {
        let mut required: Vec<&str> = Vec::new();
        if stmt.operation.requires_point_route() {
            required.push(&rule.datasource_key);
            if rule.is_table_sharded() {
                required.push(&rule.table_key);
            }
        }
        if stmt.operation.requires_primary_key() {
            required.push(stmt.entity.primary_key());
        }

        match required.into_iter().find(|column| !stmt.params.has(column)) {
            Some(missing) => Err(RouterError::UnresolvableRoute {
                entity: stmt.entity.name().to_string(),
                operation: stmt.operation,
                missing: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Shard index for `column`, `None` when the statement does not bind it
    fn key_index(
        params: &Row,
        column: &str,
        algorithm: ShardAlgorithm,
        shard_count: u32,
    ) -> RouterResult<Option<u32>> {
        match ShardKey::from_row(params, column) {
            Some(key) => strategy_for(algorithm).route(&key, shard_count).map(Some),
            None => Ok(None),
        }
    }
}
