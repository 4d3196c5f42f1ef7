//! Statement rewriting
//!
//! Produces one physical statement per route target. The only textual
//! change is the table name: `` `order` `` becomes `` `order_1` ``. The
//! bound parameters are carried over untouched.
//!
//! Pagination is pushed down only for single-target routes. A fan-out read
//! drops its window so the merger can apply it after gathering every shard;
//! pushing `LIMIT offset, n` to each shard would skip rows that belong to
//! the global page.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::statement::LogicalStatement;
use crate::types::{RouteTarget, RouteTargetSet};

/// A statement bound to one physical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalStatement {
    pub target: RouteTarget,
    pub statement: LogicalStatement,
    /// SQL text naming the physical table
    pub sql: String,
}

/// Logical → physical statement rewriter
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementRewriter;

impl StatementRewriter {
    pub fn new() -> Self {
        Self
    }

    /// One physical statement per target, in target order
    pub fn rewrite(&self, stmt: &LogicalStatement, targets: &RouteTargetSet) -> Vec<PhysicalStatement> {
        let mut per_shard = stmt.clone();
        if !targets.is_single() {
            per_shard.page = None;
        }

        let logical_sql = per_shard.to_sql();
        let logical_name = format!("`{}`", stmt.entity.name());

        targets
            .iter()
            .map(|target| {
                let sql = logical_sql.replacen(&logical_name, &format!("`{}`", target.table), 1);
                trace!(shard = %target, sql = %sql, "Statement rewritten");
                PhysicalStatement {
                    target: target.clone(),
                    statement: per_shard.clone(),
                    sql,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Page;
    use crate::types::RouteKind;
    use shardline_types::{LogicalEntity, Row};

    #[test]
    fn test_point_rewrite_keeps_page() {
        let stmt = LogicalStatement::select_page_by_foreign_key(
            LogicalEntity::Order,
            "user_id",
            3,
            Page::new(0, 10),
        );
        let targets = RouteTargetSet::cross_product(RouteKind::Point, LogicalEntity::Order, &[1], &[1]);

        let physical = StatementRewriter::new().rewrite(&stmt, &targets);
        assert_eq!(physical.len(), 1);
        assert_eq!(physical[0].statement.page, Some(Page::new(0, 10)));
        assert_eq!(
            physical[0].sql,
            "SELECT * FROM `order_1` WHERE user_id = ? LIMIT 0, 10"
        );
    }

    #[test]
    fn test_fan_out_strips_page() {
        let stmt = LogicalStatement::select_page(LogicalEntity::Order, Page::new(20, 10));
        let targets = RouteTargetSet::cross_product(
            RouteKind::Broadcast,
            LogicalEntity::Order,
            &[0, 1],
            &[0, 1],
        );

        let physical = StatementRewriter::new().rewrite(&stmt, &targets);
        assert_eq!(physical.len(), 4);
        for (p, target) in physical.iter().zip(targets.iter()) {
            assert_eq!(&p.target, target);
            assert_eq!(p.statement.page, None);
            assert_eq!(p.sql, format!("SELECT * FROM `{}`", target.table));
        }
    }

    #[test]
    fn test_parameters_preserved() {
        let row = Row::new()
            .with("order_id", 7)
            .with("user_id", 3)
            .with("product_name", "order of user");
        let stmt = LogicalStatement::insert(LogicalEntity::Order, row.clone());
        let targets = RouteTargetSet::cross_product(RouteKind::Point, LogicalEntity::Order, &[1], &[1]);

        let physical = StatementRewriter::new().rewrite(&stmt, &targets);
        assert_eq!(physical[0].statement.params, row);
        assert!(physical[0].sql.starts_with("INSERT INTO `order_1` ("));
    }
}
