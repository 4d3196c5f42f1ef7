//! Common types for the router module
//!
//! Centralizes route target definitions shared by the router, the rewriter
//! and the execution layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use shardline_core::ShardTopology;
use shardline_types::LogicalEntity;

/// Datasource index in `[0, N)`
pub type DatasourceIndex = u32;

/// Physical table index in `[0, M)`
pub type TableIndex = u32;

/// One physical placement: a datasource and a table inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteTarget {
    pub datasource_index: DatasourceIndex,
    pub table_index: TableIndex,
    /// `ds{datasource_index}`
    pub datasource: String,
    /// `{logical}_{table_index}`
    pub table: String,
}

impl RouteTarget {
    pub fn new(entity: LogicalEntity, datasource_index: DatasourceIndex, table_index: TableIndex) -> Self {
        Self {
            datasource_index,
            table_index,
            datasource: ShardTopology::datasource_name(datasource_index),
            table: ShardTopology::physical_table_name(entity, table_index),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.datasource, self.table)
    }
}

/// How much of the key space a route covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteKind {
    /// All sharding keys known, exactly one target
    Point,
    /// Datasource known, fan out over its physical tables
    DatasourceScoped,
    /// Table index known, fan out over every datasource
    TableScoped,
    /// No key known, every datasource × every table
    Broadcast,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Point => write!(f, "point"),
            RouteKind::DatasourceScoped => write!(f, "datasource-scoped"),
            RouteKind::TableScoped => write!(f, "table-scoped"),
            RouteKind::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// Resolved targets, ordered datasource-major then by table index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTargetSet {
    kind: RouteKind,
    targets: Vec<RouteTarget>,
}

impl RouteTargetSet {
    pub fn new(kind: RouteKind, targets: Vec<RouteTarget>) -> Self {
        Self { kind, targets }
    }

    /// Cross product of the given datasource and table indices
    pub fn cross_product(
        kind: RouteKind,
        entity: LogicalEntity,
        datasources: &[DatasourceIndex],
        tables: &[TableIndex],
    ) -> Self {
        let targets = datasources
            .iter()
            .flat_map(|&ds| tables.iter().map(move |&table| RouteTarget::new(entity, ds, table)))
            .collect();
        Self { kind, targets }
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// True when exactly one target was resolved
    pub fn is_single(&self) -> bool {
        self.targets.len() == 1
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[RouteTarget] {
        &self.targets
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteTarget> {
        self.targets.iter()
    }
}
