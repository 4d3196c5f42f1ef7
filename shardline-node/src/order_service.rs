//! Order CRUD over the sharding engine
//!
//! Orders are placed by `user_id` (datasource) and `order_id` (table).
//! Calls that only know the order id fan out to that table index on every
//! datasource; calls that only know the user stay on one datasource.

use std::sync::Arc;
use tracing::{info, warn};

use shardline_exec::ShardingEngine;
use shardline_router_core::{LogicalStatement, Page};
use shardline_types::{current_millis, Entity, LogicalEntity, Order, OrderStatus, Row};

use crate::error::{ServiceError, ServiceResult};

pub struct OrderService {
    engine: Arc<ShardingEngine>,
}

impl OrderService {
    pub fn new(engine: Arc<ShardingEngine>) -> Self {
        Self { engine }
    }

    /// Insert an order
    ///
    /// Assigns the order id, an order number when none was given, the
    /// pending status and both timestamps.
    pub async fn create(&self, mut order: Order) -> ServiceResult<Order> {
        info!(user_id = ?order.user_id, product = %order.product_name, "Creating order");

        let now = current_millis();
        order.create_time = Some(now);
        order.update_time = Some(now);
        if order.order_no.as_deref().map_or(true, str::is_empty) {
            order.order_no = Some(self.engine.id_generator().next_order_no());
        }
        if order.status.is_none() {
            order.status = Some(OrderStatus::Pending);
        }
        if order.order_id.is_none() {
            order.order_id = Some(self.engine.id_generator().next_id(LogicalEntity::Order.name()));
        }

        let result = self
            .engine
            .execute(LogicalStatement::insert(LogicalEntity::Order, order.to_row()))
            .await?;
        if result.count() == 0 {
            warn!(user_id = ?order.user_id, "Order insert affected no rows");
            return Err(ServiceError::OperationFailed("order insert affected no rows".to_string()));
        }

        info!(order_id = ?order.order_id, order_no = ?order.order_no, "Order created");
        Ok(order)
    }

    pub async fn get_by_id(&self, order_id: i64) -> ServiceResult<Option<Order>> {
        info!(order_id, "Querying order by id");
        let stmt = LogicalStatement::select_by_id(LogicalEntity::Order, Row::new().with("order_id", order_id));
        self.fetch_one(stmt).await
    }

    pub async fn get_by_user_id(&self, user_id: i64) -> ServiceResult<Vec<Order>> {
        info!(user_id, "Querying orders of user");
        self.fetch_many(LogicalStatement::select_by_foreign_key(LogicalEntity::Order, "user_id", user_id))
            .await
    }

    pub async fn get_by_order_no(&self, order_no: &str) -> ServiceResult<Option<Order>> {
        info!(order_no = %order_no, "Querying order by number");
        self.fetch_one(LogicalStatement::select_by_alternate_key(LogicalEntity::Order, order_no))
            .await
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Order>> {
        info!("Querying all orders");
        self.fetch_many(LogicalStatement::select_all(LogicalEntity::Order)).await
    }

    /// Update an order and return the stored version
    pub async fn update(&self, mut order: Order) -> ServiceResult<Order> {
        let order_id = order
            .order_id
            .ok_or_else(|| ServiceError::OperationFailed("order update requires order_id".to_string()))?;
        info!(order_id, "Updating order");

        order.update_time = Some(current_millis());
        let result = self
            .engine
            .execute(LogicalStatement::update(LogicalEntity::Order, order.to_row()))
            .await?;
        if result.count() == 0 {
            warn!(order_id, "Order update affected no rows");
            return Err(ServiceError::NotFound { entity: "order", id: order_id });
        }

        self.get_by_id(order_id)
            .await?
            .ok_or(ServiceError::NotFound { entity: "order", id: order_id })
    }

    /// Delete an order, true when a row was removed
    pub async fn delete(&self, order_id: i64) -> ServiceResult<bool> {
        info!(order_id, "Deleting order");
        let result = self
            .engine
            .execute(LogicalStatement::delete(LogicalEntity::Order, Row::new().with("order_id", order_id)))
            .await?;

        let deleted = result.count() > 0;
        if !deleted {
            warn!(order_id, "Order delete affected no rows");
        }
        Ok(deleted)
    }

    /// 1-based page over all orders
    pub async fn get_page(&self, page_num: u64, page_size: u64) -> ServiceResult<Vec<Order>> {
        info!(page_num, page_size, "Querying order page");
        let page = Page::from_page_number(page_num, page_size);
        self.fetch_many(LogicalStatement::select_page(LogicalEntity::Order, page)).await
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        info!("Counting orders");
        let result = self.engine.execute(LogicalStatement::count_all(LogicalEntity::Order)).await?;
        Ok(result.count())
    }

    /// 1-based page over one user's orders
    pub async fn get_page_by_user_id(
        &self,
        user_id: i64,
        page_num: u64,
        page_size: u64,
    ) -> ServiceResult<Vec<Order>> {
        info!(user_id, page_num, page_size, "Querying order page of user");
        let page = Page::from_page_number(page_num, page_size);
        self.fetch_many(LogicalStatement::select_page_by_foreign_key(
            LogicalEntity::Order,
            "user_id",
            user_id,
            page,
        ))
        .await
    }

    pub async fn count_by_user_id(&self, user_id: i64) -> ServiceResult<u64> {
        info!(user_id, "Counting orders of user");
        let result = self
            .engine
            .execute(LogicalStatement::count_by_foreign_key(LogicalEntity::Order, "user_id", user_id))
            .await?;
        Ok(result.count())
    }

    /// Set an order's status, true when a row changed
    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> ServiceResult<bool> {
        info!(order_id, status = ?status, "Updating order status");
        let row = Row::new()
            .with("order_id", order_id)
            .with("status", status.code())
            .with("update_time", current_millis());

        let result = self
            .engine
            .execute(LogicalStatement::update_status(LogicalEntity::Order, row))
            .await?;

        let updated = result.count() > 0;
        if !updated {
            warn!(order_id, status = ?status, "Order status update affected no rows");
        }
        Ok(updated)
    }

    async fn fetch_one(&self, stmt: LogicalStatement) -> ServiceResult<Option<Order>> {
        let result = self.engine.execute(stmt).await?;
        Ok(result.first().map(Order::from_row).transpose()?)
    }

    async fn fetch_many(&self, stmt: LogicalStatement) -> ServiceResult<Vec<Order>> {
        let result = self.engine.execute(stmt).await?;
        Ok(result.rows.iter().map(Order::from_row).collect::<Result<_, _>>()?)
    }
}
