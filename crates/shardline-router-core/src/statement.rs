//! Logical statements
//!
//! A logical statement names an operation on a logical table together with
//! its bound parameters. It never mentions a physical table; the router and
//! the rewriter turn it into physical statements.

use serde::{Deserialize, Serialize};
use std::fmt;

use shardline_types::{LogicalEntity, Row, Value};

/// Keyed CRUD operations understood by the sharding layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Insert,
    SelectById,
    /// Select by the owning row's key, e.g. orders of a user
    SelectByForeignKey,
    /// Select by a unique non-sharding column, e.g. `order_no`
    SelectByAlternateKey,
    SelectAll,
    SelectPage,
    SelectPageByForeignKey,
    CountAll,
    CountByForeignKey,
    Update,
    UpdateStatus,
    Delete,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Insert | Operation::Update | Operation::UpdateStatus | Operation::Delete
        )
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Operation::CountAll | Operation::CountByForeignKey)
    }

    /// Every sharding key must be known, a fan-out is never acceptable
    pub fn requires_point_route(&self) -> bool {
        matches!(self, Operation::Insert)
    }

    /// The entity's primary key must be bound
    pub fn requires_primary_key(&self) -> bool {
        matches!(
            self,
            Operation::SelectById | Operation::Update | Operation::UpdateStatus | Operation::Delete
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::SelectById => "select_by_id",
            Operation::SelectByForeignKey => "select_by_foreign_key",
            Operation::SelectByAlternateKey => "select_by_alternate_key",
            Operation::SelectAll => "select_all",
            Operation::SelectPage => "select_page",
            Operation::SelectPageByForeignKey => "select_page_by_foreign_key",
            Operation::CountAll => "count_all",
            Operation::CountByForeignKey => "count_by_foreign_key",
            Operation::Update => "update",
            Operation::UpdateStatus => "update_status",
            Operation::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// 1-based page number to offset: `(page_num - 1) * page_size`
    pub fn from_page_number(page_num: u64, page_size: u64) -> Self {
        Self {
            offset: page_num.saturating_sub(1).saturating_mul(page_size),
            limit: page_size,
        }
    }

    /// Apply the window to an already gathered row list
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// A statement against a logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalStatement {
    pub entity: LogicalEntity,
    pub operation: Operation,
    /// Row for writes, equality filter for reads
    pub params: Row,
    pub page: Option<Page>,
}

impl LogicalStatement {
    pub fn new(entity: LogicalEntity, operation: Operation, params: Row) -> Self {
        Self {
            entity,
            operation,
            params,
            page: None,
        }
    }

    pub fn insert(entity: LogicalEntity, row: Row) -> Self {
        Self::new(entity, Operation::Insert, row)
    }

    /// Select one row by primary key; pass the owner key too when it is known
    pub fn select_by_id(entity: LogicalEntity, keys: Row) -> Self {
        Self::new(entity, Operation::SelectById, keys)
    }

    pub fn select_by_foreign_key(entity: LogicalEntity, column: &str, value: impl Into<Value>) -> Self {
        Self::new(entity, Operation::SelectByForeignKey, Row::new().with(column, value))
    }

    pub fn select_by_alternate_key(entity: LogicalEntity, value: impl Into<Value>) -> Self {
        Self::new(
            entity,
            Operation::SelectByAlternateKey,
            Row::new().with(entity.alternate_key(), value),
        )
    }

    pub fn select_all(entity: LogicalEntity) -> Self {
        Self::new(entity, Operation::SelectAll, Row::new())
    }

    pub fn select_page(entity: LogicalEntity, page: Page) -> Self {
        Self::new(entity, Operation::SelectPage, Row::new()).with_page(page)
    }

    pub fn select_page_by_foreign_key(
        entity: LogicalEntity,
        column: &str,
        value: impl Into<Value>,
        page: Page,
    ) -> Self {
        Self::new(
            entity,
            Operation::SelectPageByForeignKey,
            Row::new().with(column, value),
        )
        .with_page(page)
    }

    pub fn count_all(entity: LogicalEntity) -> Self {
        Self::new(entity, Operation::CountAll, Row::new())
    }

    pub fn count_by_foreign_key(entity: LogicalEntity, column: &str, value: impl Into<Value>) -> Self {
        Self::new(entity, Operation::CountByForeignKey, Row::new().with(column, value))
    }

    pub fn update(entity: LogicalEntity, row: Row) -> Self {
        Self::new(entity, Operation::Update, row)
    }

    pub fn update_status(entity: LogicalEntity, row: Row) -> Self {
        Self::new(entity, Operation::UpdateStatus, row)
    }

    pub fn delete(entity: LogicalEntity, keys: Row) -> Self {
        Self::new(entity, Operation::Delete, keys)
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Rows a statement must match
    ///
    /// Updates match on the primary key only, every other column is an
    /// assignment. Inserts match nothing.
    pub fn filter(&self) -> Row {
        match self.operation {
            Operation::Insert => Row::new(),
            Operation::Update | Operation::UpdateStatus => {
                let pk = self.entity.primary_key();
                let mut filter = Row::new();
                if let Some(value) = self.params.get(pk) {
                    filter.set(pk, value.clone());
                }
                filter
            }
            _ => self.params.clone(),
        }
    }

    /// Column assignments of an update, primary key excluded
    pub fn assignments(&self) -> Row {
        let mut assignments = self.params.clone();
        assignments.remove(self.entity.primary_key());
        assignments
    }

    /// SQL text against the logical table, table name quoted as `` `name` ``
    pub fn to_sql(&self) -> String {
        let table = format!("`{}`", self.entity.name());
        let where_clause = Self::where_clause(&self.filter());
        let limit_clause = self
            .page
            .map(|p| format!(" LIMIT {}, {}", p.offset, p.limit))
            .unwrap_or_default();

        match self.operation {
            Operation::Insert => {
                let columns: Vec<&str> = self.params.iter().map(|(c, _)| c.as_str()).collect();
                let placeholders = vec!["?"; columns.len()].join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders
                )
            }
            Operation::Update | Operation::UpdateStatus => {
                let sets: Vec<String> = self
                    .assignments()
                    .iter()
                    .map(|(c, _)| format!("{} = ?", c))
                    .collect();
                format!("UPDATE {} SET {}{}", table, sets.join(", "), where_clause)
            }
            Operation::Delete => format!("DELETE FROM {}{}", table, where_clause),
            Operation::CountAll | Operation::CountByForeignKey => {
                format!("SELECT COUNT(*) FROM {}{}", table, where_clause)
            }
            _ => format!("SELECT * FROM {}{}{}", table, where_clause, limit_clause),
        }
    }

    fn where_clause(filter: &Row) -> String {
        if filter.is_empty() {
            return String::new();
        }
        let predicates: Vec<String> = filter.iter().map(|(c, _)| format!("{} = ?", c)).collect();
        format!(" WHERE {}", predicates.join(" AND "))
    }
}
