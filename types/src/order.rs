//! Order entity
//!
//! Placement:
//! - `user_id` selects the datasource, so a user's orders share one database
//! - `order_id` selects the physical table inside that datasource

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, LogicalEntity};
use crate::value::Row;
use crate::{TypesError, TypesResult};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn code(&self) -> i64 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Completed => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    pub fn from_code(code: i64) -> TypesResult<Self> {
        match code {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Paid),
            2 => Ok(OrderStatus::Shipped),
            3 => Ok(OrderStatus::Completed),
            4 => Ok(OrderStatus::Cancelled),
            other => Err(TypesError::InvalidValue {
                column: "status".to_string(),
                reason: format!("unknown order status {}", other),
            }),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A purchase order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Table sharding key, assigned on insert when absent
    pub order_id: Option<i64>,
    /// Datasource sharding key
    pub user_id: Option<i64>,
    pub order_no: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    /// Amount in the smallest currency unit
    pub amount_cents: i64,
    pub status: Option<OrderStatus>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
    pub remark: Option<String>,
}

impl Order {
    /// Create an order for `user_id`
    ///
    /// # Parameters
    /// - `user_id`: Owner, decides the datasource
    /// - `product_name`: Purchased product
    /// - `amount_cents`: Total amount
    pub fn new(user_id: i64, product_name: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            order_id: None,
            user_id: Some(user_id),
            order_no: None,
            product_name: product_name.into(),
            quantity: 1,
            amount_cents,
            status: None,
            create_time: None,
            update_time: None,
            remark: None,
        }
    }

    pub fn with_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

impl Entity for Order {
    const LOGICAL: LogicalEntity = LogicalEntity::Order;

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.set_opt("order_id", self.order_id);
        row.set_opt("user_id", self.user_id);
        row.set_opt("order_no", self.order_no.clone());
        row.set("product_name", self.product_name.as_str());
        row.set("quantity", self.quantity);
        row.set("amount_cents", self.amount_cents);
        row.set_opt("status", self.status.map(|s| s.code()));
        row.set_opt("create_time", self.create_time);
        row.set_opt("update_time", self.update_time);
        row.set_opt("remark", self.remark.clone());
        row
    }

    fn from_row(row: &Row) -> TypesResult<Self> {
        Ok(Self {
            order_id: Some(row.require_int("order_id")?),
            user_id: Some(row.require_int("user_id")?),
            order_no: row.optional_text("order_no")?,
            product_name: row.require_text("product_name")?,
            quantity: row.optional_int("quantity")?.unwrap_or(1),
            amount_cents: row.require_int("amount_cents")?,
            status: row
                .optional_int("status")?
                .map(OrderStatus::from_code)
                .transpose()?,
            create_time: row.optional_int("create_time")?,
            update_time: row.optional_int("update_time")?,
            remark: row.optional_text("remark")?,
        })
    }
}
