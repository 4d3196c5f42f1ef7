//! Logical entities
//!
//! A logical entity is the table as callers see it (`user`, `order`),
//! independent of which physical datasource or table stores a row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::value::Row;
use crate::{TypesError, TypesResult};

/// Logical entities known to the sharding layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalEntity {
    User,
    Order,
}

const USER_COLUMNS: &[&str] = &[
    "user_id",
    "username",
    "password",
    "email",
    "phone",
    "status",
    "create_time",
    "update_time",
];

const ORDER_COLUMNS: &[&str] = &[
    "order_id",
    "user_id",
    "order_no",
    "product_name",
    "quantity",
    "amount_cents",
    "status",
    "create_time",
    "update_time",
    "remark",
];

impl LogicalEntity {
    pub const ALL: [LogicalEntity; 2] = [LogicalEntity::User, LogicalEntity::Order];

    /// Logical table name
    pub fn name(&self) -> &'static str {
        match self {
            LogicalEntity::User => "user",
            LogicalEntity::Order => "order",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            LogicalEntity::User => USER_COLUMNS,
            LogicalEntity::Order => ORDER_COLUMNS,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Column identifying a single row
    pub fn primary_key(&self) -> &'static str {
        match self {
            LogicalEntity::User => "user_id",
            LogicalEntity::Order => "order_id",
        }
    }

    /// Unique business key that is not a sharding key
    pub fn alternate_key(&self) -> &'static str {
        match self {
            LogicalEntity::User => "username",
            LogicalEntity::Order => "order_no",
        }
    }
}

impl fmt::Display for LogicalEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LogicalEntity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(LogicalEntity::User),
            "order" => Ok(LogicalEntity::Order),
            other => Err(TypesError::UnknownEntity(other.to_string())),
        }
    }
}

/// Conversion between a typed entity and its storage row
pub trait Entity: Sized {
    /// The logical table this entity lives in
    const LOGICAL: LogicalEntity;

    /// Encode to a row. Absent optional fields are omitted.
    fn to_row(&self) -> Row;

    /// Decode from a stored row
    fn from_row(row: &Row) -> TypesResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_names_round_trip() {
        for entity in LogicalEntity::ALL {
            assert_eq!(entity.name().parse::<LogicalEntity>().unwrap(), entity);
        }
        assert!(matches!(
            "payment".parse::<LogicalEntity>(),
            Err(TypesError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_keys_are_columns() {
        for entity in LogicalEntity::ALL {
            assert!(entity.has_column(entity.primary_key()));
            assert!(entity.has_column(entity.alternate_key()));
        }
        assert!(LogicalEntity::Order.has_column("user_id"));
        assert!(!LogicalEntity::User.has_column("order_id"));
    }
}
