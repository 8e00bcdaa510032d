//! Order repository.
//!
//! An order is inserted exactly once per checkout attempt. The order number is
//! generated by the caller and never regenerated here: a unique violation is
//! reported as a collision so the customer can resubmit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use sqlx::types::Json;
use tracing::instrument;

use saffron_core::{
    CustomerInfo, Email, LineItem, NewOrder, Order, OrderId, OrderNumber, OrderStatus,
    OrderTotals, OrderType, PhoneNumber, UserId,
};

use super::RepositoryError;

/// `insufficient_privilege`
const SQLSTATE_PERMISSION_DENIED: &str = "42501";

/// Why an order insert failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderInsertError {
    #[error("order number {0} already exists")]
    Collision(OrderNumber),

    #[error("invalid order data: {0}")]
    InvalidData(String),

    #[error("permission denied writing orders")]
    PermissionDenied,

    #[error("failed to create order: {0}")]
    Other(String),
}

impl OrderInsertError {
    /// Message shown to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Collision(_) => "Order number collision, please retry.".to_string(),
            Self::InvalidData(_) => {
                "Invalid order data. Please review your cart and try again.".to_string()
            }
            Self::PermissionDenied => {
                "We couldn't save your order. Please contact support.".to_string()
            }
            Self::Other(message) => format!("Failed to create order: {message}"),
        }
    }

    fn classify(
        kind: ErrorKind,
        code: Option<&str>,
        message: &str,
        order_number: &OrderNumber,
    ) -> Self {
        match kind {
            ErrorKind::UniqueViolation => Self::Collision(order_number.clone()),
            ErrorKind::ForeignKeyViolation => Self::InvalidData(message.to_string()),
            _ if code == Some(SQLSTATE_PERMISSION_DENIED) => Self::PermissionDenied,
            _ => Self::Other(message.to_string()),
        }
    }

    fn from_sqlx(err: &sqlx::Error, order_number: &OrderNumber) -> Self {
        if let sqlx::Error::Database(db_err) = err {
            let code = db_err.code();
            return Self::classify(
                db_err.kind(),
                code.as_deref(),
                db_err.message(),
                order_number,
            );
        }
        Self::Other(err.to_string())
    }
}

/// Order persistence used by checkout and checkout completion.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order with `status = pending`.
    async fn insert(&self, order: &NewOrder) -> Result<Order, OrderInsertError>;

    /// Transition an order from `pending` to `paid`.
    async fn mark_paid(&self, order_number: &OrderNumber) -> Result<Order, RepositoryError>;

    async fn find_by_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// `PostgreSQL` order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pending orders created before `older_than`, oldest first.
    ///
    /// These are checkouts whose payment was never confirmed and need manual
    /// reconciliation against the payment provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored row no longer validates.
    #[instrument(skip(self))]
    pub async fn list_stale_pending(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE status = 'pending' AND created_at < $1
             ORDER BY created_at"
        ))
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_phone, customer_email, \
     delivery_address, notes, order_type, items, subtotal, discount, tax, delivery_fee, total, \
     coupon_code, delivery_minutes, status, user_id, created_at, updated_at";

#[async_trait]
impl OrderRepository for PgOrderStore {
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn insert(&self, order: &NewOrder) -> Result<Order, OrderInsertError> {
        let delivery_minutes = order
            .delivery_minutes
            .map(i32::try_from)
            .transpose()
            .map_err(|_| OrderInsertError::InvalidData("delivery estimate too large".into()))?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (
                order_number, customer_name, customer_phone, customer_email,
                delivery_address, notes, order_type, items,
                subtotal, discount, tax, delivery_fee, total,
                coupon_code, delivery_minutes, user_id
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_number)
        .bind(&order.customer.name)
        .bind(order.customer.phone.as_str())
        .bind(order.customer.email.as_str())
        .bind(order.customer.delivery_address.as_deref())
        .bind(order.customer.notes.as_deref())
        .bind(order.order_type)
        .bind(Json(&order.items))
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.tax)
        .bind(order.totals.delivery_fee)
        .bind(order.totals.total)
        .bind(order.coupon_code.as_deref())
        .bind(delivery_minutes)
        .bind(order.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = OrderInsertError::from_sqlx(&e, &order.order_number);
            tracing::error!(error = %e, "Order insert failed");
            err
        })?;

        Order::try_from(row).map_err(|e| OrderInsertError::Other(e.to_string()))
    }

    #[instrument(skip(self), fields(order_number = %order_number))]
    async fn mark_paid(&self, order_number: &OrderNumber) -> Result<Order, RepositoryError> {
        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = 'paid', updated_at = NOW()
             WHERE order_number = $1 AND status = 'pending'
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Order::try_from(row);
        }

        // Distinguish "no such order" from "already moved past pending"
        match self.find_by_number(order_number).await? {
            Some(order) if order.status == OrderStatus::Paid => Ok(order),
            Some(order) => Err(RepositoryError::Conflict(format!(
                "order {order_number} is {}",
                order.status
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    #[instrument(skip(self), fields(order_number = %order_number))]
    async fn find_by_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    customer_name: String,
    customer_phone: String,
    customer_email: String,
    delivery_address: Option<String>,
    notes: Option<String>,
    order_type: OrderType,
    items: Json<Vec<LineItem>>,
    subtotal: Decimal,
    discount: Decimal,
    tax: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    coupon_code: Option<String>,
    delivery_minutes: Option<i32>,
    status: OrderStatus,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} in database: {e}"))
        };

        let order_number =
            OrderNumber::parse(&row.order_number).map_err(|e| corrupt("order number", &e))?;
        let phone = PhoneNumber::parse(&row.customer_phone).map_err(|e| corrupt("phone", &e))?;
        let email = Email::parse(&row.customer_email).map_err(|e| corrupt("email", &e))?;
        let delivery_minutes = row
            .delivery_minutes
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt("delivery minutes", &e))?;

        Ok(Self {
            id: row.id,
            order_number,
            customer: CustomerInfo {
                name: row.customer_name,
                phone,
                email,
                delivery_address: row.delivery_address,
                notes: row.notes,
            },
            order_type: row.order_type,
            items: row.items.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                discount: row.discount,
                tax: row.tax,
                delivery_fee: row.delivery_fee,
                total: row.total,
            },
            coupon_code: row.coupon_code,
            delivery_minutes,
            status: row.status,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn number() -> OrderNumber {
        OrderNumber::parse("ORD-20260314-0042").unwrap()
    }

    #[test]
    fn test_classify_unique_violation_as_collision() {
        let err = OrderInsertError::classify(
            ErrorKind::UniqueViolation,
            Some("23505"),
            "duplicate key value violates unique constraint",
            &number(),
        );
        assert_eq!(err, OrderInsertError::Collision(number()));
        assert_eq!(err.user_message(), "Order number collision, please retry.");
    }

    #[test]
    fn test_classify_foreign_key_violation() {
        let err = OrderInsertError::classify(
            ErrorKind::ForeignKeyViolation,
            Some("23503"),
            "violates foreign key constraint \"orders_user_id_fkey\"",
            &number(),
        );
        assert!(matches!(err, OrderInsertError::InvalidData(_)));
        assert!(err.user_message().starts_with("Invalid order data"));
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = OrderInsertError::classify(
            ErrorKind::Other,
            Some("42501"),
            "permission denied for table orders",
            &number(),
        );
        assert_eq!(err, OrderInsertError::PermissionDenied);
        assert!(err.user_message().contains("contact support"));
    }

    #[test]
    fn test_classify_other_keeps_raw_message() {
        let err = OrderInsertError::classify(
            ErrorKind::CheckViolation,
            Some("23514"),
            "new row violates check constraint \"orders_total_check\"",
            &number(),
        );
        assert_eq!(
            err.user_message(),
            "Failed to create order: new row violates check constraint \"orders_total_check\""
        );
    }

    #[test]
    fn test_non_database_error_is_other() {
        let err = OrderInsertError::from_sqlx(&sqlx::Error::PoolTimedOut, &number());
        assert!(matches!(err, OrderInsertError::Other(_)));
    }
}
