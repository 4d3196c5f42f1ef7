//! Sharding Strategies
//!
//! A strategy maps a sharding key to a shard index in `[0, shard_count)`.
//! The same strategy is used for both dimensions of a route:
//!
//! ```text
//! LogicalStatement
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │  Datasource Selection   │  datasource_key → ds{i}
//! │   (Which database?)     │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │    Table Selection      │  table_key → {logical}_{j}
//! │   (Which table?)        │
//! └─────────────────────────┘
//! ```
//!
//! - `ModuloStrategy`: `key mod n` on integer keys
//! - `HashModStrategy`: `blake3(key) mod n`, any key

mod hash_mod;
mod modulo;

pub use hash_mod::HashModStrategy;
pub use modulo::ModuloStrategy;

use shardline_core::ShardAlgorithm;
use shardline_types::ShardKey;

use crate::error::RouterError;

/// Trait for key → shard index strategies
///
/// Implementations are pure: the same key and count always give the same
/// index, which lets independent processes agree on placement.
pub trait ShardStrategy: Send + Sync {
    /// Route a key to a shard index in `[0, shard_count)`
    fn route(&self, key: &ShardKey, shard_count: u32) -> Result<u32, RouterError>;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Strategy implementing a configured algorithm
pub fn strategy_for(algorithm: ShardAlgorithm) -> &'static dyn ShardStrategy {
    match algorithm {
        ShardAlgorithm::Modulo => &ModuloStrategy,
        ShardAlgorithm::HashMod => &HashModStrategy,
    }
}

fn check_shard_count(shard_count: u32) -> Result<(), RouterError> {
    if shard_count == 0 {
        return Err(RouterError::InvalidKey(
            "shard count must be positive".to_string(),
        ));
    }
    Ok(())
}
