use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiError;
use common_money::{clamp_non_negative, line_subtotal};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart;
use crate::error::CheckoutError;
use crate::ledger;
use crate::pricing::{self, PriceLine};
use crate::repo::{self, OrderStatus, PaymentStatus};
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct CreateOrderRequest {
    pub cart_item_ids: Vec<i64>,
    #[serde(default)]
    pub coupon_id: Option<i64>,
    #[serde(default)]
    pub used_point: Option<i64>,
    pub payment_method: String,
}

#[derive(Serialize, Debug)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
}

#[derive(Serialize, Debug)]
pub struct ConfirmPaymentResponse {
    pub payment_id: Uuid,
}

#[derive(Serialize, Debug)]
pub struct OrdersResponse {
    pub orders: Vec<repo::Order>,
}

#[derive(Serialize, Debug)]
pub struct OrderItemsResponse {
    pub order: repo::Order,
    pub items: Vec<repo::OrderItem>,
}

/// Opens a transaction bounded by a statement timeout, so lock waits
/// surface as retryable errors instead of hanging the request.
async fn bound_transaction(pool: &PgPool) -> sqlx::Result<Transaction<'_, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET LOCAL statement_timeout = '5s'")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// The order writer: one transaction from cart snapshot to cart
/// deletion. Any failure rolls the whole thing back; the only effect a
/// caller can observe on success is the new order id.
pub async fn write_order(
    pool: &PgPool,
    owner_id: Uuid,
    req: &CreateOrderRequest,
) -> Result<Uuid, CheckoutError> {
    let mut tx = bound_transaction(pool).await?;

    let items = cart::snapshot_for_update(&mut tx, owner_id, &req.cart_item_ids).await?;
    if items.is_empty() {
        return Err(CheckoutError::EmptySelection);
    }

    // Provisional row first so order_items can reference the id.
    let order_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, owner_id, status, total_amount, used_point, coupon_discount, payment_method)
         VALUES ($1, $2, $3, 0, 0, 0, $4)",
    )
    .bind(order_id)
    .bind(owner_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(&req.payment_method)
    .execute(&mut *tx)
    .await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in &items {
        let subtotal = line_subtotal(item.unit_price, item.discount_price, item.quantity);
        sqlx::query(
            "INSERT INTO order_items (order_id, schedule_id, quantity, unit_price, discount_price, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order_id)
        .bind(item.schedule_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount_price)
        .bind(subtotal)
        .execute(&mut *tx)
        .await?;
        lines.push(PriceLine {
            unit_price: item.unit_price,
            discount_price: item.discount_price,
            quantity: item.quantity,
        });
    }

    // An invalid coupon (used, expired, unknown, foreign) is silently
    // priced as no discount; only a valid one is consumed here.
    let redeemed = match req.coupon_id {
        Some(coupon_id) => ledger::redeem_coupon(&mut tx, owner_id, coupon_id).await?,
        None => None,
    };

    let requested_point = req.used_point.unwrap_or(0);
    let balance = if requested_point > 0 {
        ledger::point_balance(&mut tx, owner_id).await?
    } else {
        0
    };

    let quote = pricing::price(&lines, redeemed.and_then(|c| c.rule), requested_point, balance);

    if quote.point_applied > 0 {
        ledger::redeem_points(&mut tx, owner_id, quote.point_applied).await?;
    }

    sqlx::query(
        "UPDATE orders
         SET total_amount = $2, used_point = $3, coupon_id = $4, coupon_discount = $5, updated_at = now()
         WHERE id = $1",
    )
    .bind(order_id)
    .bind(quote.total)
    .bind(quote.point_applied)
    .bind(redeemed.map(|c| c.coupon_id))
    .bind(quote.coupon_discount)
    .execute(&mut *tx)
    .await?;

    // The rows now belong to the order, not the cart.
    let consumed: Vec<i64> = items.iter().map(|item| item.id).collect();
    cart::delete_items(&mut tx, &consumed).await?;

    tx.commit().await?;

    info!(
        order_id = %order_id,
        owner_id = %owner_id,
        subtotal = quote.subtotal,
        coupon_discount = quote.coupon_discount,
        point_applied = quote.point_applied,
        total = quote.total,
        "order created"
    );
    Ok(order_id)
}

/// The payment confirmer. Locks the order row, recomputes the
/// authoritative total from the persisted order items (the order's own
/// stored total is not trusted at this step), records the payment and
/// flips the status — all in one transaction. The buy-now purge runs
/// after commit; if it fails the payment is still valid and the caller
/// gets the distinguished paid-not-finalized error.
pub async fn confirm_order_payment(
    pool: &PgPool,
    owner_id: Uuid,
    order_id: Uuid,
) -> Result<Uuid, CheckoutError> {
    let mut tx = bound_transaction(pool).await?;

    let order = repo::lock_order(&mut tx, order_id, owner_id)
        .await?
        .ok_or(CheckoutError::OrderNotFound)?;

    if !repo::is_valid_transition(&order.status, OrderStatus::Paid) {
        return Err(CheckoutError::InvalidStatus {
            actual: order.status,
            action: "confirm payment",
        });
    }

    let subtotal = repo::items_subtotal(&mut tx, order_id).await?;
    let amount = clamp_non_negative(subtotal - order.coupon_discount - order.used_point);

    let payment_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO payments (id, owner_id, order_id, amount, method, status)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(payment_id)
    .bind(owner_id)
    .bind(order_id)
    .bind(amount)
    .bind(&order.payment_method)
    .bind(PaymentStatus::Complete.as_str())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE orders SET status = $2, total_amount = $3, payment_id = $4, updated_at = now()
         WHERE id = $1",
    )
    .bind(order_id)
    .bind(OrderStatus::Paid.as_str())
    .bind(amount)
    .bind(payment_id)
    .execute(&mut *tx)
    .await?;

    // Already true on the normal path; re-asserted in case the coupon
    // row was touched out of band between creation and confirmation.
    if let Some(coupon_id) = order.coupon_id {
        ledger::ensure_coupon_used(&mut tx, coupon_id).await?;
    }

    tx.commit().await?;

    info!(order_id = %order_id, payment_id = %payment_id, amount, "payment confirmed");

    if let Err(err) = cart::purge_buy_now(pool, owner_id).await {
        warn!(order_id = %order_id, payment_id = %payment_id, error = %err, "buy-now purge failed after payment commit");
        return Err(CheckoutError::PaidNotFinalized {
            payment_id,
            source: err,
        });
    }

    Ok(payment_id)
}

/// The refund processor: flips order and payment to refunded. Coupon
/// and point ledger entries consumed by the order are left as-is.
pub async fn refund_order_tx(
    pool: &PgPool,
    owner_id: Uuid,
    order_id: Uuid,
) -> Result<(), CheckoutError> {
    let mut tx = bound_transaction(pool).await?;

    let order = repo::lock_order(&mut tx, order_id, owner_id)
        .await?
        .ok_or(CheckoutError::OrderNotFound)?;

    if !repo::is_valid_transition(&order.status, OrderStatus::Refunded) {
        return Err(CheckoutError::InvalidStatus {
            actual: order.status,
            action: "refund",
        });
    }

    sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
        .bind(order_id)
        .bind(OrderStatus::Refunded.as_str())
        .execute(&mut *tx)
        .await?;

    if let Some(payment_id) = order.payment_id {
        sqlx::query("UPDATE payments SET status = $2, updated_at = now() WHERE id = $1")
            .bind(payment_id)
            .bind(PaymentStatus::Refunded.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(order_id = %order_id, owner_id = %owner_id, "order refunded");
    Ok(())
}

pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    if req.payment_method.trim().is_empty() {
        return Err(ApiError::bad_request("invalid_payment_method", None));
    }
    let order_id = write_order(&state.db, auth.owner_id(), &req).await?;
    Ok(Json(CreateOrderResponse { order_id }))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let payment_id = confirm_order_payment(&state.db, auth.owner_id(), order_id).await?;
    Ok(Json(ConfirmPaymentResponse { payment_id }))
}

pub async fn refund_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    refund_order_tx(&state.db, auth.owner_id(), order_id).await?;
    Ok(Json(serde_json::json!({})))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OrdersResponse>, ApiError> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, None))?;
    let orders = repo::list_orders(&mut conn, auth.owner_id())
        .await
        .map_err(|e| ApiError::internal(e, None))?;
    Ok(Json(OrdersResponse { orders }))
}

pub async fn get_order_items(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderItemsResponse>, ApiError> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, None))?;
    let order = repo::fetch_order(&mut conn, order_id, auth.owner_id())
        .await
        .map_err(|e| ApiError::internal(e, None))?
        .ok_or(ApiError::NotFound {
            code: "order_not_found",
            trace_id: None,
        })?;
    let items = repo::list_order_items(&mut conn, order_id)
        .await
        .map_err(|e| ApiError::internal(e, None))?;
    Ok(Json(OrderItemsResponse { order, items }))
}
