use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::pricing::CouponRule;

// Coupon and point state are shared flip/append-only ledgers touched by
// both the order writer and the payment confirmer. Every mutation goes
// through this module and takes the connection of an open transaction;
// there is no standalone entry point.

/// A coupon that has just been flipped to used inside the current
/// transaction. `rule` is absent when the template's discount_type is
/// unrecognized; the coupon is still consumed and linked, it just
/// prices as a zero discount.
#[derive(Debug, Clone, Copy)]
pub struct RedeemedCoupon {
    pub coupon_id: i64,
    pub rule: Option<CouponRule>,
}

#[derive(Debug, sqlx::FromRow)]
struct CouponTemplateRow {
    id: i64,
    discount_type: String,
    discount_amount: i64,
    discount_value: i64,
}

/// Validates and consumes a coupon in one step: locks the row, checks
/// unused + unexpired + owned by the caller, flips `used`. Unknown,
/// foreign, already-used and expired coupons all collapse to `None` —
/// "no discount", never an error. This silent tolerance is deliberate
/// and matched by the order writer.
pub async fn redeem_coupon(
    conn: &mut PgConnection,
    owner_id: Uuid,
    coupon_id: i64,
) -> sqlx::Result<Option<RedeemedCoupon>> {
    let row = sqlx::query_as::<_, CouponTemplateRow>(
        "SELECT c.id, t.discount_type, t.discount_amount, t.discount_value
         FROM coupons c
         JOIN coupon_templates t ON t.id = c.template_id
         WHERE c.id = $1 AND c.owner_id = $2 AND c.used = FALSE
           AND (c.expiry_date IS NULL OR c.expiry_date > now())
         FOR UPDATE OF c",
    )
    .bind(coupon_id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    sqlx::query("UPDATE coupons SET used = TRUE WHERE id = $1")
        .bind(row.id)
        .execute(conn)
        .await?;

    Ok(Some(RedeemedCoupon {
        coupon_id: row.id,
        rule: CouponRule::from_template(&row.discount_type, row.discount_amount, row.discount_value),
    }))
}

/// Re-marks a coupon as used. Idempotent; the payment confirmer calls
/// this to make sure the linkage persisted at order creation holds.
pub async fn ensure_coupon_used(conn: &mut PgConnection, coupon_id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE coupons SET used = TRUE WHERE id = $1")
        .bind(coupon_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Current balance: sum of accruals minus sum of redemptions over the
/// append-only ledger.
pub async fn point_balance(conn: &mut PgConnection, owner_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(CASE WHEN change_type = 'accrual' THEN amount ELSE -amount END), 0)::BIGINT
         FROM point_ledger WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_one(conn)
    .await
}

/// Appends a redemption entry. Entries are never updated or deleted;
/// a refund does not reverse them.
pub async fn redeem_points(
    conn: &mut PgConnection,
    owner_id: Uuid,
    amount: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO point_ledger (owner_id, change_type, amount, used_at)
         VALUES ($1, 'redemption', $2, $3)",
    )
    .bind(owner_id)
    .bind(amount)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
