//! Shardline Types - entity model shared by every layer
//!
//! - `value`: column values, rows and sharding keys
//! - `entity`: logical entities and the row codec trait
//! - `user` / `order`: the two sharded entities

// ========== Core Modules ==========
pub mod value;
pub mod entity;

// ========== Entities ==========
pub mod user;
pub mod order;

pub use value::{Row, ShardKey, Value};
pub use entity::{Entity, LogicalEntity};
pub use user::{User, UserStatus};
pub use order::{Order, OrderStatus};

// Error types
pub type TypesResult<T> = Result<T, TypesError>;

#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid value for column {column}: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn current_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
