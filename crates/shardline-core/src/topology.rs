//! Shard topology
//!
//! The validated, immutable description of where every logical table lives:
//! how many datasources exist, how many physical tables each logical table
//! is split into, and which column and algorithm select each dimension.
//! Built once at startup and shared read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use shardline_types::LogicalEntity;

use crate::config::{ShardingConfig, TableRuleConfig};
use crate::error::{CoreError, CoreResult};

/// Datasource naming prefix: `ds0`, `ds1`, ...
pub const DATASOURCE_PREFIX: &str = "ds";

/// Key → index algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardAlgorithm {
    /// `key mod count` on integer keys
    Modulo,
    /// `blake3(key) mod count`, accepts any key
    HashMod,
}

impl FromStr for ShardAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modulo" | "mod" => Ok(ShardAlgorithm::Modulo),
            "hash_mod" => Ok(ShardAlgorithm::HashMod),
            other => Err(CoreError::InvalidTopology(format!(
                "unknown sharding algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ShardAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardAlgorithm::Modulo => write!(f, "modulo"),
            ShardAlgorithm::HashMod => write!(f, "hash_mod"),
        }
    }
}

/// Resolved sharding rule for one logical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRule {
    pub entity: LogicalEntity,
    pub datasource_key: String,
    pub datasource_algorithm: ShardAlgorithm,
    pub table_key: String,
    pub table_shard_count: u32,
    pub table_algorithm: ShardAlgorithm,
    pub generated_key: Option<String>,
}

impl TableRule {
    fn from_config(entity: LogicalEntity, cfg: &TableRuleConfig) -> CoreResult<Self> {
        if cfg.shard_count < 1 {
            return Err(CoreError::InvalidTopology(format!(
                "{}: shard_count must be >= 1",
                entity
            )));
        }

        let mut columns = vec![cfg.datasource_key.as_str(), cfg.key_field.as_str()];
        if let Some(generated) = &cfg.generated_key {
            columns.push(generated.as_str());
        }
        for column in columns {
            if !entity.has_column(column) {
                return Err(CoreError::InvalidTopology(format!(
                    "{}: {} is not a column",
                    entity, column
                )));
            }
        }

        Ok(Self {
            entity,
            datasource_key: cfg.datasource_key.clone(),
            datasource_algorithm: cfg.datasource_algorithm.parse()?,
            table_key: cfg.key_field.clone(),
            table_shard_count: cfg.shard_count,
            table_algorithm: cfg.algorithm.parse()?,
            generated_key: cfg.generated_key.clone(),
        })
    }

    pub fn is_table_sharded(&self) -> bool {
        self.table_shard_count > 1
    }
}

/// Immutable shard layout
#[derive(Debug, Clone)]
pub struct ShardTopology {
    datasource_count: u32,
    rules: BTreeMap<LogicalEntity, TableRule>,
}

impl ShardTopology {
    /// Validate a configuration and build the topology
    pub fn from_config(config: &ShardingConfig) -> CoreResult<Self> {
        if config.datasource_count < 1 {
            return Err(CoreError::InvalidTopology(
                "datasource_count must be >= 1".to_string(),
            ));
        }

        let mut rules = BTreeMap::new();
        for (name, cfg) in &config.tables {
            let entity: LogicalEntity = name
                .parse()
                .map_err(|_| CoreError::InvalidTopology(format!("unknown logical table: {}", name)))?;
            rules.insert(entity, TableRule::from_config(entity, cfg)?);
        }

        let topology = Self {
            datasource_count: config.datasource_count,
            rules,
        };

        info!(
            datasources = topology.datasource_count,
            tables = topology.rules.len(),
            "Shard topology loaded"
        );

        Ok(topology)
    }

    pub fn datasource_count(&self) -> u32 {
        self.datasource_count
    }

    pub fn rule(&self, entity: LogicalEntity) -> Option<&TableRule> {
        self.rules.get(&entity)
    }

    pub fn rules(&self) -> impl Iterator<Item = &TableRule> {
        self.rules.values()
    }

    /// Physical table count of a logical table, 1 when it has no rule
    pub fn table_shard_count(&self, entity: LogicalEntity) -> u32 {
        self.rule(entity).map(|r| r.table_shard_count).unwrap_or(1)
    }

    /// Largest shard count the topology routes over, datasources included
    pub fn max_shard_count(&self) -> u32 {
        self.rules()
            .map(|r| r.table_shard_count)
            .fold(self.datasource_count, u32::max)
    }

    pub fn datasource_name(index: u32) -> String {
        format!("{}{}", DATASOURCE_PREFIX, index)
    }

    pub fn physical_table_name(entity: LogicalEntity, index: u32) -> String {
        format!("{}_{}", entity.name(), index)
    }

    pub fn datasource_names(&self) -> Vec<String> {
        (0..self.datasource_count).map(Self::datasource_name).collect()
    }

    /// Every physical table of `entity` inside one datasource
    pub fn physical_tables(&self, entity: LogicalEntity) -> Vec<String> {
        (0..self.table_shard_count(entity))
            .map(|i| Self::physical_table_name(entity, i))
            .collect()
    }

    /// Check that every datasource the topology addresses is available
    pub fn validate_datasources(&self, available: &[String]) -> CoreResult<()> {
        for name in self.datasource_names() {
            if !available.contains(&name) {
                return Err(CoreError::MissingDatasource(name));
            }
        }
        Ok(())
    }
}
