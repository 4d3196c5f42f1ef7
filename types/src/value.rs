//! Row values and sharding keys
//!
//! A [`Row`] is the unit every backend stores and returns: an ordered map of
//! column name to [`Value`]. Sharding keys are extracted from rows as
//! [`ShardKey`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{TypesError, TypesResult};

/// A single column value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered column → value map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column assignment
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column. `Value::Null` is stored as an explicit null.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    /// Set a column only when the value is present
    pub fn set_opt<T: Into<Value>>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.set(column, v);
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Integer value of a column, `None` when absent, null or not an integer
    pub fn get_int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_int)
    }

    pub fn get_text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_text)
    }

    /// Whether the column is present with a non-null value
    pub fn has(&self, column: &str) -> bool {
        self.get(column).map(|v| !v.is_null()).unwrap_or(false)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.remove(column)
    }

    pub fn require_int(&self, column: &str) -> TypesResult<i64> {
        match self.get(column) {
            None | Some(Value::Null) => Err(TypesError::MissingColumn(column.to_string())),
            Some(Value::Int(v)) => Ok(*v),
            Some(other) => Err(TypesError::InvalidValue {
                column: column.to_string(),
                reason: format!("expected integer, got {}", other),
            }),
        }
    }

    pub fn require_text(&self, column: &str) -> TypesResult<String> {
        match self.get(column) {
            None | Some(Value::Null) => Err(TypesError::MissingColumn(column.to_string())),
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(other) => Err(TypesError::InvalidValue {
                column: column.to_string(),
                reason: format!("expected text, got {}", other),
            }),
        }
    }

    pub fn optional_int(&self, column: &str) -> TypesResult<Option<i64>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.require_int(column).map(Some),
        }
    }

    pub fn optional_text(&self, column: &str) -> TypesResult<Option<String>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.require_text(column).map(Some),
        }
    }

    /// Overwrite this row's columns with every column present in `patch`
    pub fn apply_patch(&mut self, patch: &Row) {
        for (column, value) in &patch.columns {
            self.columns.insert(column.clone(), value.clone());
        }
    }

    /// True when every column of `filter` is present here with an equal value
    pub fn matches(&self, filter: &Row) -> bool {
        filter
            .columns
            .iter()
            .all(|(column, value)| self.columns.get(column) == Some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.columns) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self.columns),
        }
    }
}

/// A typed sharding key value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShardKey {
    Int(i64),
    Text(String),
}

impl ShardKey {
    /// Extract a key from a column value. Null has no key.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(v) => Some(ShardKey::Int(*v)),
            Value::Text(s) => Some(ShardKey::Text(s.clone())),
        }
    }

    /// Look up `column` in `row` and convert it to a key
    pub fn from_row(row: &Row, column: &str) -> Option<Self> {
        row.get(column).and_then(Self::from_value)
    }

    /// Canonical byte form used by hash-based strategies
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            ShardKey::Int(v) => v.to_le_bytes().to_vec(),
            ShardKey::Text(s) => s.as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardKey::Int(v) => write!(f, "{}", v),
            ShardKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ShardKey {
    fn from(v: i64) -> Self {
        ShardKey::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::new()
            .with("user_id", 7)
            .with("username", "alice")
            .with("email", Value::Null);

        assert_eq!(row.get_int("user_id"), Some(7));
        assert_eq!(row.get_text("username"), Some("alice"));
        assert!(!row.has("email"));
        assert!(row.optional_text("email").unwrap().is_none());
        assert!(matches!(
            row.require_int("username"),
            Err(TypesError::InvalidValue { .. })
        ));
        assert!(matches!(row.require_int("phone"), Err(TypesError::MissingColumn(_))));
    }

    #[test]
    fn test_patch_and_match() {
        let mut row = Row::new().with("order_id", 1).with("status", 0);
        row.apply_patch(&Row::new().with("status", 2));

        assert_eq!(row.get_int("status"), Some(2));
        assert!(row.matches(&Row::new().with("order_id", 1)));
        assert!(!row.matches(&Row::new().with("order_id", 2)));
        assert!(row.matches(&Row::new()));
    }

    #[test]
    fn test_shard_key_extraction() {
        let row = Row::new().with("user_id", 3).with("order_no", "ORDER1");

        assert_eq!(ShardKey::from_row(&row, "user_id"), Some(ShardKey::Int(3)));
        assert_eq!(
            ShardKey::from_row(&row, "order_no"),
            Some(ShardKey::Text("ORDER1".to_string()))
        );
        assert_eq!(ShardKey::from_row(&row, "order_id"), None);
        assert_eq!(ShardKey::from_value(&Value::Null), None);
    }

    #[test]
    fn test_row_display_is_json() {
        let row = Row::new().with("a", 1).with("b", "x").with("c", Value::Null);
        assert_eq!(row.to_string(), r#"{"a":1,"b":"x","c":null}"#);
    }
}
