//! Modulo Shard Strategy
//!
//! Routes a row by `key mod shard_count`.
//! Same key always goes to the same shard, without any coordination.
//!
//! Accepted keys:
//! - Integer keys
//! - Text keys holding a decimal integer
//!
//! Negative keys use the Euclidean remainder so the index stays in range.

use tracing::trace;

use shardline_types::ShardKey;

use super::{check_shard_count, ShardStrategy};
use crate::error::RouterError;

/// Modulo routing strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuloStrategy;

impl ModuloStrategy {
    fn integer_key(key: &ShardKey) -> Result<i64, RouterError> {
        match key {
            ShardKey::Int(v) => Ok(*v),
            ShardKey::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| RouterError::InvalidKey(format!("not an integer: {:?}", s))),
        }
    }
}

impl ShardStrategy for ModuloStrategy {
    fn route(&self, key: &ShardKey, shard_count: u32) -> Result<u32, RouterError> {
        check_shard_count(shard_count)?;

        let value = Self::integer_key(key)?;
        let index = value.rem_euclid(shard_count as i64) as u32;

        trace!(key = %key, shard_count, index, "Modulo route");
        Ok(index)
    }

    fn name(&self) -> &'static str {
        "Modulo"
    }
}
