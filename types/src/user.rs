//! User entity
//!
//! Placement:
//! - `user_id` selects the datasource
//! - Users are not table-sharded, one `user_0` table per datasource

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, LogicalEntity};
use crate::value::Row;
use crate::{TypesError, TypesResult};

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Disabled,
    Enabled,
}

impl UserStatus {
    pub fn code(&self) -> i64 {
        match self {
            UserStatus::Disabled => 0,
            UserStatus::Enabled => 1,
        }
    }

    pub fn from_code(code: i64) -> TypesResult<Self> {
        match code {
            0 => Ok(UserStatus::Disabled),
            1 => Ok(UserStatus::Enabled),
            other => Err(TypesError::InvalidValue {
                column: "status".to_string(),
                reason: format!("unknown user status {}", other),
            }),
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Enabled
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sharding key, assigned on insert when absent
    pub user_id: Option<i64>,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<UserStatus>,
    /// Milliseconds since the Unix epoch
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl User {
    /// Create a user with only the required fields set
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            password: password.into(),
            email: None,
            phone: None,
            status: None,
            create_time: None,
            update_time: None,
        }
    }

    pub fn with_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

impl Entity for User {
    const LOGICAL: LogicalEntity = LogicalEntity::User;

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.set_opt("user_id", self.user_id);
        row.set("username", self.username.as_str());
        row.set("password", self.password.as_str());
        row.set_opt("email", self.email.clone());
        row.set_opt("phone", self.phone.clone());
        row.set_opt("status", self.status.map(|s| s.code()));
        row.set_opt("create_time", self.create_time);
        row.set_opt("update_time", self.update_time);
        row
    }

    fn from_row(row: &Row) -> TypesResult<Self> {
        Ok(Self {
            user_id: Some(row.require_int("user_id")?),
            username: row.require_text("username")?,
            password: row.optional_text("password")?.unwrap_or_default(),
            email: row.optional_text("email")?,
            phone: row.optional_text("phone")?,
            status: row
                .optional_int("status")?
                .map(UserStatus::from_code)
                .transpose()?,
            create_time: row.optional_int("create_time")?,
            update_time: row.optional_int("update_time")?,
        })
    }
}
