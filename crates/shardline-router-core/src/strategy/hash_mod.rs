//! Hash-Mod Shard Strategy
//!
//! Hashes the key with blake3 before taking the remainder, so text keys and
//! sequential integer keys spread evenly across shards.

use blake3::Hasher;
use tracing::trace;

use shardline_types::ShardKey;

use super::{check_shard_count, ShardStrategy};
use crate::error::RouterError;

/// Hash-mod routing strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct HashModStrategy;

impl HashModStrategy {
    /// Hash a key using blake3
    fn hash_key(key: &ShardKey) -> u64 {
        let mut hasher = Hasher::new();
        hasher.update(&key.canonical_bytes());
        let hash = hasher.finalize();
        let bytes = hash.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

impl ShardStrategy for HashModStrategy {
    fn route(&self, key: &ShardKey, shard_count: u32) -> Result<u32, RouterError> {
        check_shard_count(shard_count)?;

        let hash = Self::hash_key(key);
        let index = (hash % shard_count as u64) as u32;

        trace!(key = %key, hash = %hash, index, "Hash-mod route");
        Ok(index)
    }

    fn name(&self) -> &'static str {
        "HashMod"
    }
}
