//! Backend registry - tracks the datasources statements can be sent to
//!
//! A backend is the storage collaborator behind one datasource name
//! (`ds0`, `ds1`, ...). The execution layer only sees the trait; the
//! in-memory reference backend lives in `memory`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use shardline_router_core::{PhysicalStatement, RouteTarget};
use shardline_types::Row;

use crate::error::BackendError;

/// What one shard returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardOutput {
    /// Rows of a select
    Rows(Vec<Row>),
    /// Rows touched by a write
    Affected(u64),
    /// Result of a count
    Count(u64),
}

impl ShardOutput {
    pub fn rows(&self) -> &[Row] {
        match self {
            ShardOutput::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ShardOutput::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    /// Count, affected rows, or number of rows returned
    pub fn count(&self) -> u64 {
        match self {
            ShardOutput::Rows(rows) => rows.len() as u64,
            ShardOutput::Affected(n) | ShardOutput::Count(n) => *n,
        }
    }
}

/// Output of one shard together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardResult {
    pub target: RouteTarget,
    pub output: ShardOutput,
}

/// Storage collaborator for one datasource
#[async_trait]
pub trait ShardBackend: Send + Sync {
    /// Datasource name, `ds{i}`
    fn name(&self) -> &str;

    /// Execute a statement against the physical table it names
    async fn execute(&self, stmt: &PhysicalStatement) -> Result<ShardOutput, BackendError>;
}

/// Registry of datasource backends, keyed by name
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<BTreeMap<String, Arc<dyn ShardBackend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name, replacing any previous one
    pub fn register(&self, backend: Arc<dyn ShardBackend>) {
        let name = backend.name().to_string();
        info!(datasource = %name, "Registering backend");
        self.backends.write().insert(name, backend);
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ShardBackend>> {
        info!(datasource = %name, "Unregistering backend");
        self.backends.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ShardBackend>> {
        let backend = self.backends.read().get(name).cloned();
        if backend.is_none() {
            debug!(datasource = %name, "Backend lookup missed");
        }
        backend
    }

    /// Registered datasource names, sorted
    pub fn names(&self) -> Vec<String> {
        self.backends.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.backends.read().len()
    }
}
