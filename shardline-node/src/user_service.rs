//! User CRUD over the sharding engine
//!
//! Users live in one physical table per datasource, placed by `user_id`.
//! Lookups by username and listings have no sharding key and broadcast.

use std::sync::Arc;
use tracing::{info, warn};

use shardline_exec::ShardingEngine;
use shardline_router_core::{LogicalStatement, Page};
use shardline_types::{current_millis, Entity, LogicalEntity, Row, User, UserStatus};

use crate::error::{ServiceError, ServiceResult};

pub struct UserService {
    engine: Arc<ShardingEngine>,
}

impl UserService {
    pub fn new(engine: Arc<ShardingEngine>) -> Self {
        Self { engine }
    }

    /// Insert a user, assigning id, timestamps and the enabled status
    pub async fn create(&self, mut user: User) -> ServiceResult<User> {
        info!(username = %user.username, "Creating user");

        let now = current_millis();
        user.create_time = Some(now);
        user.update_time = Some(now);
        if user.status.is_none() {
            user.status = Some(UserStatus::Enabled);
        }
        if user.user_id.is_none() {
            user.user_id = Some(self.engine.id_generator().next_id(LogicalEntity::User.name()));
        }

        let result = self
            .engine
            .execute(LogicalStatement::insert(LogicalEntity::User, user.to_row()))
            .await?;
        if result.count() == 0 {
            warn!(username = %user.username, "User insert affected no rows");
            return Err(ServiceError::OperationFailed("user insert affected no rows".to_string()));
        }

        info!(user_id = ?user.user_id, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, user_id: i64) -> ServiceResult<Option<User>> {
        info!(user_id, "Querying user by id");
        let stmt = LogicalStatement::select_by_id(LogicalEntity::User, Row::new().with("user_id", user_id));
        self.fetch_one(stmt).await
    }

    pub async fn get_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        info!(username = %username, "Querying user by username");
        self.fetch_one(LogicalStatement::select_by_alternate_key(LogicalEntity::User, username))
            .await
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<User>> {
        info!("Querying all users");
        self.fetch_many(LogicalStatement::select_all(LogicalEntity::User)).await
    }

    /// Update a user and return the stored version
    pub async fn update(&self, mut user: User) -> ServiceResult<User> {
        let user_id = user
            .user_id
            .ok_or_else(|| ServiceError::OperationFailed("user update requires user_id".to_string()))?;
        info!(user_id, "Updating user");

        user.update_time = Some(current_millis());
        let result = self
            .engine
            .execute(LogicalStatement::update(LogicalEntity::User, user.to_row()))
            .await?;
        if result.count() == 0 {
            warn!(user_id, "User update affected no rows");
            return Err(ServiceError::NotFound { entity: "user", id: user_id });
        }

        self.get_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound { entity: "user", id: user_id })
    }

    /// Delete a user, true when a row was removed
    pub async fn delete(&self, user_id: i64) -> ServiceResult<bool> {
        info!(user_id, "Deleting user");
        let result = self
            .engine
            .execute(LogicalStatement::delete(LogicalEntity::User, Row::new().with("user_id", user_id)))
            .await?;

        let deleted = result.count() > 0;
        if !deleted {
            warn!(user_id, "User delete affected no rows");
        }
        Ok(deleted)
    }

    /// 1-based page of users
    pub async fn get_page(&self, page_num: u64, page_size: u64) -> ServiceResult<Vec<User>> {
        info!(page_num, page_size, "Querying user page");
        let page = Page::from_page_number(page_num, page_size);
        self.fetch_many(LogicalStatement::select_page(LogicalEntity::User, page)).await
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        info!("Counting users");
        let result = self.engine.execute(LogicalStatement::count_all(LogicalEntity::User)).await?;
        Ok(result.count())
    }

    async fn fetch_one(&self, stmt: LogicalStatement) -> ServiceResult<Option<User>> {
        let result = self.engine.execute(stmt).await?;
        Ok(result.first().map(User::from_row).transpose()?)
    }

    async fn fetch_many(&self, stmt: LogicalStatement) -> ServiceResult<Vec<User>> {
        let result = self.engine.execute(stmt).await?;
        Ok(result.rows.iter().map(User::from_row).collect::<Result<_, _>>()?)
    }
}
