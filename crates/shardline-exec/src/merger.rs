//! Result merging
//!
//! Folds per-shard results into one logical result. Rows keep shard order
//! (target order, then each shard's own order); there is no global sort.
//! A fan-out page window is applied here, after every row was gathered.

use serde::{Deserialize, Serialize};
use tracing::trace;

use shardline_router_core::{Operation, Page};
use shardline_types::Row;

use crate::backend::ShardResult;

/// How shard results combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Rows of every shard, in shard order
    Concat,
    /// Sum of counts or affected rows
    Sum,
    /// First row found, in shard order
    First,
}

impl MergeMode {
    /// Merge mode implied by an operation
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            op if op.is_count() || op.is_write() => MergeMode::Sum,
            Operation::SelectById | Operation::SelectByAlternateKey => MergeMode::First,
            _ => MergeMode::Concat,
        }
    }
}

/// Logical result of a statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedResult {
    pub rows: Vec<Row>,
    /// Summed count, or affected rows of a write
    pub total: Option<u64>,
}

impl MergedResult {
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }

    /// Summed total, falling back to the number of rows
    pub fn count(&self) -> u64 {
        self.total.unwrap_or(self.rows.len() as u64)
    }
}

/// Stateless merger of shard results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger;

impl ResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge results; `page` is applied only to `Concat`
    pub fn merge(&self, results: Vec<ShardResult>, mode: MergeMode, page: Option<Page>) -> MergedResult {
        let shards = results.len();
        let merged = match mode {
            MergeMode::Concat => {
                let rows: Vec<Row> = results
                    .into_iter()
                    .flat_map(|r| r.output.into_rows())
                    .collect();
                MergedResult {
                    rows: match page {
                        Some(page) => page.slice(rows),
                        None => rows,
                    },
                    total: None,
                }
            }
            MergeMode::Sum => MergedResult {
                rows: Vec::new(),
                total: Some(results.iter().map(|r| r.output.count()).sum()),
            },
            MergeMode::First => MergedResult {
                rows: results
                    .into_iter()
                    .flat_map(|r| r.output.into_rows())
                    .take(1)
                    .collect(),
                total: None,
            },
        };

        trace!(shards, mode = ?mode, rows = merged.rows.len(), total = ?merged.total, "Results merged");
        merged
    }
}
