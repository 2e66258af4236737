use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid transitions:
/// pending -> paid (payment confirmation)
/// paid -> refunded (refund)
/// Terminal: refunded. There is no cancel-from-pending and no un-refund;
/// anything else should return HTTP 409.
pub fn is_valid_transition(from_status: &str, to: OrderStatus) -> bool {
    match OrderStatus::from_str(from_status) {
        Some(OrderStatus::Pending) => matches!(to, OrderStatus::Paid),
        Some(OrderStatus::Paid) => matches!(to, OrderStatus::Refunded),
        Some(OrderStatus::Refunded) => false,
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Complete,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Complete => "complete",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub status: String,
    pub total_amount: i64,
    pub used_point: i64,
    pub coupon_id: Option<i64>,
    pub coupon_discount: i64,
    pub payment_id: Option<Uuid>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: Uuid,
    pub schedule_id: i64,
    pub quantity: i32,
    pub unit_price: i64,
    pub discount_price: i64,
    pub subtotal: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, owner_id, status, total_amount, used_point, coupon_id, coupon_discount, payment_id, payment_method, created_at, updated_at";

/// Locks the order row for the rest of the transaction, scoped to the
/// caller's ownership. The lock is what makes payment confirmation
/// idempotent under concurrency: the second confirmer blocks here and
/// then sees the flipped status.
pub async fn lock_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    owner_id: Uuid,
) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND owner_id = $2 FOR UPDATE"
    ))
    .bind(order_id)
    .bind(owner_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    owner_id: Uuid,
) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND owner_id = $2"
    ))
    .bind(order_id)
    .bind(owner_id)
    .fetch_optional(conn)
    .await
}

pub async fn list_orders(conn: &mut PgConnection, owner_id: Uuid) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(conn)
    .await
}

pub async fn list_order_items(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> sqlx::Result<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, schedule_id, quantity, unit_price, discount_price, subtotal
         FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

/// The authoritative subtotal: recomputed from the persisted order
/// items, never read back from the order's stored total.
pub async fn items_subtotal(conn: &mut PgConnection, order_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(subtotal), 0)::BIGINT FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(conn)
    .await
}
