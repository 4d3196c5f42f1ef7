//! Shardline Core - configuration and shard topology
//!
//! This crate provides the process-wide, read-only description of how
//! logical tables are spread over datasources and physical tables.

pub mod config;
pub mod error;
pub mod topology;

pub use config::{ExecutionConfig, IdConfig, ShardingConfig, TableRuleConfig};
pub use error::{CoreError, CoreResult};
pub use topology::{ShardAlgorithm, ShardTopology, TableRule, DATASOURCE_PREFIX};
