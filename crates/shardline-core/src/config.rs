//! Configuration module for Shardline nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};

/// Sharding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingConfig {
    /// Number of physical datasources (`ds0`..`dsN-1`)
    pub datasource_count: u32,

    /// Per logical table sharding rules, keyed by logical table name
    pub tables: BTreeMap<String, TableRuleConfig>,

    /// Scatter-gather execution settings
    pub execution: ExecutionConfig,

    /// Identifier generation settings
    pub id: IdConfig,
}

/// Sharding rule for one logical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRuleConfig {
    /// Column selecting the datasource
    pub datasource_key: String,

    /// Algorithm applied to `datasource_key`
    #[serde(default = "default_algorithm")]
    pub datasource_algorithm: String,

    /// Column selecting the physical table
    pub key_field: String,

    /// Number of physical tables per datasource
    pub shard_count: u32,

    /// Algorithm applied to `key_field`
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Column filled from the id generator on insert when absent
    #[serde(default)]
    pub generated_key: Option<String>,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum shard operations in flight for one broadcast
    pub max_concurrency: usize,

    /// Upper bound on waiting for a single shard, `None` waits forever
    pub scatter_timeout_ms: Option<u64>,

    /// Connections per datasource
    pub pool_size: usize,

    /// How long to wait for a pooled connection
    pub acquire_timeout_ms: u64,
}

/// Identifier generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// Worker identifier embedded in generated ids (0..1023)
    pub worker_id: u16,

    /// Largest starting sequence offset for a new millisecond
    ///
    /// Acts as a floor: the engine raises it to `max_shard_count - 1` so
    /// generated keys reach every datasource and table.
    pub max_vibration_offset: u16,
}

fn default_algorithm() -> String {
    "modulo".to_string()
}

impl TableRuleConfig {
    /// Rule with modulo algorithms on both dimensions
    pub fn modulo(datasource_key: &str, key_field: &str, shard_count: u32) -> Self {
        Self {
            datasource_key: datasource_key.to_string(),
            datasource_algorithm: default_algorithm(),
            key_field: key_field.to_string(),
            shard_count,
            algorithm: default_algorithm(),
            generated_key: None,
        }
    }

    /// Set the column assigned by the id generator
    pub fn with_generated_key(mut self, column: &str) -> Self {
        self.generated_key = Some(column.to_string());
        self
    }
}

impl Default for ShardingConfig {
    fn default() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            "user".to_string(),
            TableRuleConfig::modulo("user_id", "user_id", 1).with_generated_key("user_id"),
        );
        tables.insert(
            "order".to_string(),
            TableRuleConfig::modulo("user_id", "order_id", 2).with_generated_key("order_id"),
        );

        Self {
            datasource_count: 2,
            tables,
            execution: ExecutionConfig::default(),
            id: IdConfig::default(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            scatter_timeout_ms: Some(30_000),
            pool_size: 8,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            max_vibration_offset: 1,
        }
    }
}

impl ShardingConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidConfig(e.to_string()))
    }

    /// Load configuration from environment variables
    ///
    /// `SHARDLINE_CONFIG` names a JSON file used as the base; the remaining
    /// variables override individual settings.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = match std::env::var("SHARDLINE_CONFIG") {
            Ok(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|e| CoreError::InvalidConfig(format!("{}: {}", path, e)))?;
                Self::from_json_str(&json)?
            }
            Err(_) => ShardingConfig::default(),
        };

        // Datasources
        if let Some(count) = env_parse::<u32>("SHARDLINE_DATASOURCES")? {
            config.datasource_count = count;
        }

        // Order tables per datasource
        if let Some(count) = env_parse::<u32>("SHARDLINE_ORDER_TABLES")? {
            if let Some(rule) = config.tables.get_mut("order") {
                rule.shard_count = count;
            }
        }

        if let Some(worker_id) = env_parse::<u16>("SHARDLINE_WORKER_ID")? {
            config.id.worker_id = worker_id;
        }

        if let Some(max) = env_parse::<usize>("SHARDLINE_MAX_CONCURRENCY")? {
            config.execution.max_concurrency = max;
        }

        if let Some(timeout) = env_parse::<u64>("SHARDLINE_SCATTER_TIMEOUT_MS")? {
            // 0 disables the timeout
            config.execution.scatter_timeout_ms = (timeout > 0).then_some(timeout);
        }

        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> CoreResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::InvalidConfig(format!("{} is not valid: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShardingConfig::default();
        assert_eq!(config.datasource_count, 2);
        assert_eq!(config.tables["order"].shard_count, 2);
        assert_eq!(config.tables["order"].key_field, "order_id");
        assert_eq!(config.tables["user"].shard_count, 1);
        assert_eq!(config.execution.scatter_timeout_ms, Some(30_000));
    }

    #[test]
    fn test_json_config() {
        let config = ShardingConfig::from_json_str(
            r#"{
                "datasource_count": 4,
                "tables": {
                    "order": {
                        "datasource_key": "user_id",
                        "key_field": "order_id",
                        "shard_count": 8,
                        "algorithm": "hash_mod"
                    }
                },
                "id": { "worker_id": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.datasource_count, 4);
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.tables["order"].algorithm, "hash_mod");
        assert_eq!(config.tables["order"].datasource_algorithm, "modulo");
        assert_eq!(config.id.worker_id, 3);
        assert_eq!(config.id.max_vibration_offset, 1);
        assert_eq!(config.execution.max_concurrency, 16);
    }

    #[test]
    fn test_malformed_json() {
        let result = ShardingConfig::from_json_str("{ datasource_count: ");
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }
}
