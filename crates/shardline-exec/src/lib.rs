//! Shardline Exec - Scatter-Gather Execution Module
//!
//! Sends physical statements to datasource backends and folds their
//! results into one logical result.
//!
//! # Architecture
//!
//! ```text
//! Vec<PhysicalStatement>
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │  ExecutionCoordinator   │  Point inline, fan-out as bounded tasks
//! └───────────┬─────────────┘
//!             │  BackendRegistry: ds{i} → ShardBackend
//!             ▼
//! ┌─────────────────────────┐
//! │      ResultMerger       │  Concat / Sum / First, page after gather
//! └─────────────────────────┘
//! ```
//!
//! `ShardingEngine` wires the router from `shardline-router-core` in front
//! of both.

mod error;
mod backend;
mod memory;
mod coordinator;
mod merger;
mod engine;

// Re-exports: Error types
pub use error::{BackendError, EngineError, EngineResult, ExecError, ExecResult, ShardFailure};

// Re-exports: Backends
pub use backend::{BackendRegistry, ShardBackend, ShardOutput, ShardResult};
pub use memory::MemoryBackend;

// Re-exports: Execution
pub use coordinator::ExecutionCoordinator;
pub use merger::{MergeMode, MergedResult, ResultMerger};
pub use engine::ShardingEngine;
