//! Order records.
//!
//! An order is written once with `status = pending`. Line items and totals are
//! a snapshot of the cart at submission time and are never recomputed, so the
//! charged amount stays stable when menu prices change later.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartItem;
use super::customer::CustomerInfo;
use super::id::{OrderId, UserId};
use super::order_number::OrderNumber;
use super::pricing::OrderTotals;
use super::status::{OrderStatus, OrderType};

/// Immutable copy of a cart line stored in `orders.items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl From<&CartItem> for LineItem {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// Everything needed to insert an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer: CustomerInfo,
    pub order_type: OrderType,
    pub items: Vec<LineItem>,
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    /// Drive-time estimate when the delivery address was verified.
    pub delivery_minutes: Option<u32>,
    /// Owning account, `None` for guest checkout.
    pub user_id: Option<UserId>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer: CustomerInfo,
    pub order_type: OrderType,
    pub items: Vec<LineItem>,
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    pub delivery_minutes: Option<u32>,
    pub status: OrderStatus,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Delivery address, present iff this is a delivery order.
    #[must_use]
    pub fn delivery_address(&self) -> Option<&str> {
        self.customer.delivery_address.as_deref()
    }
}
