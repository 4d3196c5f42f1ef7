//! Shardline Router Core - Statement Routing Module
//!
//! Turns logical statements into physical statements against concrete
//! datasources and tables.
//!
//! # Architecture
//!
//! ```text
//! LogicalStatement
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │      IdGenerator        │  Assigns missing keys on insert
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │      ShardRouter        │  Decides: point, scoped or broadcast
//! │  (Which ds / table?)    │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │   StatementRewriter     │  `order` → `order_1`, one per target
//! └─────────────────────────┘
//! ```
//!
//! # Sharding Strategies
//!
//! - **ModuloStrategy**: `key mod n` (the default for both dimensions)
//! - **HashModStrategy**: `blake3(key) mod n` for non-numeric keys
//!
//! # Example
//!
//! ```rust,ignore
//! use shardline_router_core::{IdGenerator, LogicalStatement, ShardRouter, StatementRewriter};
//!
//! let router = ShardRouter::new(topology, Arc::new(IdGenerator::default()));
//!
//! let mut stmt = LogicalStatement::insert(LogicalEntity::Order, row);
//! let targets = router.route(&mut stmt)?;
//! let physical = StatementRewriter::new().rewrite(&stmt, &targets);
//! ```

mod error;
mod types;
mod statement;

mod strategy;

mod id_gen;
mod router;
mod rewriter;

// Re-exports: Error types
pub use error::{RouterError, RouterResult};

// Re-exports: Core types
pub use types::{DatasourceIndex, RouteKind, RouteTarget, RouteTargetSet, TableIndex};
pub use statement::{LogicalStatement, Operation, Page};

// Re-exports: Strategy trait and implementations
pub use strategy::{strategy_for, HashModStrategy, ModuloStrategy, ShardStrategy};

// Re-exports: Key generation
pub use id_gen::{decompose, IdGenerator, ID_EPOCH_MILLIS, MAX_WORKER_ID};

// Re-exports: Routing and rewriting
pub use router::ShardRouter;
pub use rewriter::{PhysicalStatement, StatementRewriter};
