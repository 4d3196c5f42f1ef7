//! In-memory reference backend
//!
//! Stores each physical table as a row list and interprets logical
//! statements directly. Models a connection pool with a semaphore: every
//! statement holds one permit for its whole duration, and waiting longer
//! than the acquire timeout reports the datasource as unavailable.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use shardline_core::ExecutionConfig;
use shardline_router_core::{Operation, PhysicalStatement};
use shardline_types::Row;

use crate::backend::{ShardBackend, ShardOutput};
use crate::error::BackendError;

const DEFAULT_POOL_SIZE: usize = 8;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory datasource
pub struct MemoryBackend {
    name: String,
    tables: RwLock<HashMap<String, Vec<Row>>>,
    pool: Arc<Semaphore>,
    acquire_timeout: Duration,
    available: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(HashMap::new()),
            pool: Arc::new(Semaphore::new(DEFAULT_POOL_SIZE)),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Pool size and acquire timeout from the execution config
    pub fn from_config(name: impl Into<String>, config: &ExecutionConfig) -> Self {
        Self::new(name)
            .with_pool_size(config.pool_size)
            .with_acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool = Arc::new(Semaphore::new(size.max(1)));
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Delay every statement, used to exercise timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Take the datasource down or bring it back
    pub fn set_available(&self, available: bool) {
        warn!(datasource = %self.name, available, "Datasource availability changed");
        self.available.store(available, Ordering::SeqCst);
    }

    /// Free pooled connections
    pub fn idle_connections(&self) -> usize {
        self.pool.available_permits()
    }

    /// Snapshot of a physical table
    pub fn table_rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, BackendError> {
        match tokio::time::timeout(self.acquire_timeout, self.pool.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(self.unavailable("connection pool closed")),
            Err(_) => Err(self.unavailable(&format!(
                "no connection within {}ms",
                self.acquire_timeout.as_millis()
            ))),
        }
    }

    fn unavailable(&self, reason: &str) -> BackendError {
        BackendError::Unavailable {
            datasource: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn apply(&self, stmt: &PhysicalStatement) -> Result<ShardOutput, BackendError> {
        let logical = &stmt.statement;
        let table_name = &stmt.target.table;
        let filter = logical.filter();

        let mut tables = self.tables.write();
        let table = tables.entry(table_name.clone()).or_default();

        let output = match logical.operation {
            Operation::Insert => {
                let pk = logical.entity.primary_key();
                if let Some(id) = logical.params.get(pk) {
                    if table.iter().any(|row| row.get(pk) == Some(id)) {
                        return Err(BackendError::Statement {
                            target: stmt.target.to_string(),
                            reason: format!("duplicate {} {}", pk, id),
                        });
                    }
                }
                table.push(logical.params.clone());
                ShardOutput::Affected(1)
            }
            Operation::Update | Operation::UpdateStatus => {
                let assignments = logical.assignments();
                let mut affected = 0;
                for row in table.iter_mut().filter(|row| row.matches(&filter)) {
                    row.apply_patch(&assignments);
                    affected += 1;
                }
                ShardOutput::Affected(affected)
            }
            Operation::Delete => {
                let before = table.len();
                table.retain(|row| !row.matches(&filter));
                ShardOutput::Affected((before - table.len()) as u64)
            }
            Operation::CountAll | Operation::CountByForeignKey => {
                ShardOutput::Count(table.iter().filter(|row| row.matches(&filter)).count() as u64)
            }
            Operation::SelectById
            | Operation::SelectByForeignKey
            | Operation::SelectByAlternateKey
            | Operation::SelectAll
            | Operation::SelectPage
            | Operation::SelectPageByForeignKey => {
                let rows: Vec<Row> = table
                    .iter()
                    .filter(|row| row.matches(&filter))
                    .cloned()
                    .collect();
                match logical.page {
                    Some(page) => ShardOutput::Rows(page.slice(rows)),
                    None => ShardOutput::Rows(rows),
                }
            }
        };

        Ok(output)
    }
}

#[async_trait]
impl ShardBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, stmt: &PhysicalStatement) -> Result<ShardOutput, BackendError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(self.unavailable("datasource is down"));
        }
        if stmt.target.datasource != self.name {
            return Err(BackendError::Statement {
                target: stmt.target.to_string(),
                reason: format!("statement addressed to {} reached {}", stmt.target.datasource, self.name),
            });
        }

        let _permit = self.acquire().await?;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let output = self.apply(stmt)?;
        debug!(
            shard = %stmt.target,
            sql = %stmt.sql,
            count = output.count(),
            "Statement executed"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_router_core::{LogicalStatement, Page, RouteTarget};
    use shardline_types::LogicalEntity;

    fn physical(stmt: LogicalStatement, ds: u32, table: u32) -> PhysicalStatement {
        let target = RouteTarget::new(stmt.entity, ds, table);
        PhysicalStatement {
            sql: stmt.to_sql(),
            target,
            statement: stmt,
        }
    }

    fn order(order_id: i64, user_id: i64) -> Row {
        Row::new()
            .with("order_id", order_id)
            .with("user_id", user_id)
            .with("status", 0)
    }

    #[tokio::test]
    async fn test_insert_select_update_delete() {
        let backend = MemoryBackend::new("ds0");

        for id in [2, 4, 6] {
            let stmt = LogicalStatement::insert(LogicalEntity::Order, order(id, 10));
            assert_eq!(backend.execute(&physical(stmt, 0, 0)).await.unwrap(), ShardOutput::Affected(1));
        }

        let select = LogicalStatement::select_by_foreign_key(LogicalEntity::Order, "user_id", 10);
        assert_eq!(backend.execute(&physical(select, 0, 0)).await.unwrap().count(), 3);

        let update = LogicalStatement::update_status(
            LogicalEntity::Order,
            Row::new().with("order_id", 4).with("status", 1),
        );
        assert_eq!(backend.execute(&physical(update, 0, 0)).await.unwrap(), ShardOutput::Affected(1));
        let rows = backend.table_rows("order_0");
        assert_eq!(rows[1].get_int("status"), Some(1));
        assert_eq!(rows[0].get_int("status"), Some(0));

        let delete = LogicalStatement::delete(LogicalEntity::Order, Row::new().with("order_id", 2));
        assert_eq!(backend.execute(&physical(delete, 0, 0)).await.unwrap(), ShardOutput::Affected(1));

        let count = LogicalStatement::count_all(LogicalEntity::Order);
        assert_eq!(backend.execute(&physical(count, 0, 0)).await.unwrap(), ShardOutput::Count(2));
    }

    #[tokio::test]
    async fn test_duplicate_primary_key_rejected() {
        let backend = MemoryBackend::new("ds0");
        let stmt = LogicalStatement::insert(LogicalEntity::Order, order(1, 1));

        backend.execute(&physical(stmt.clone(), 0, 1)).await.unwrap();
        let result = backend.execute(&physical(stmt, 0, 1)).await;
        assert!(matches!(result, Err(BackendError::Statement { .. })));
    }

    #[tokio::test]
    async fn test_page_applied_on_shard() {
        let backend = MemoryBackend::new("ds0");
        for id in 0..5 {
            let stmt = LogicalStatement::insert(LogicalEntity::Order, order(id, 1));
            backend.execute(&physical(stmt, 0, 0)).await.unwrap();
        }

        let page = LogicalStatement::select_page(LogicalEntity::Order, Page::new(3, 10));
        let rows = backend.execute(&physical(page, 0, 0)).await.unwrap().into_rows();
        let ids: Vec<i64> = rows.iter().filter_map(|r| r.get_int("order_id")).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_unavailable_datasource() {
        let backend = MemoryBackend::new("ds0");
        backend.set_available(false);

        let stmt = LogicalStatement::select_all(LogicalEntity::User);
        let result = backend.execute(&physical(stmt, 0, 0)).await;
        assert!(matches!(result, Err(BackendError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_wrong_datasource_rejected() {
        let backend = MemoryBackend::new("ds0");
        let stmt = LogicalStatement::select_all(LogicalEntity::User);
        let result = backend.execute(&physical(stmt, 1, 0)).await;
        assert!(matches!(result, Err(BackendError::Statement { .. })));
    }

    #[tokio::test]
    async fn test_pool_exhaustion_and_release() {
        let backend = Arc::new(
            MemoryBackend::new("ds0")
                .with_pool_size(1)
                .with_acquire_timeout(Duration::from_millis(20))
                .with_latency(Duration::from_millis(200)),
        );

        let slow = {
            let backend = backend.clone();
            tokio::spawn(async move {
                let stmt = LogicalStatement::select_all(LogicalEntity::User);
                backend.execute(&physical(stmt, 0, 0)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stmt = LogicalStatement::select_all(LogicalEntity::User);
        let result = backend.execute(&physical(stmt, 0, 0)).await;
        assert!(matches!(result, Err(BackendError::Unavailable { .. })));

        assert!(slow.await.unwrap().is_ok());
        assert_eq!(backend.idle_connections(), 1);
    }
}
