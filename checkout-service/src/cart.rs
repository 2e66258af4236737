use serde::Serialize;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

/// A pre-order selection row. `kind` distinguishes the regular cart
/// from the ephemeral single-item "buy now" cart.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: i64,
    pub owner_id: Uuid,
    pub schedule_id: i64,
    pub quantity: i32,
    pub unit_price: i64,
    pub discount_price: i64,
    pub kind: String,
}

pub const KIND_BUY_NOW: &str = "buy_now";

/// Loads the caller's rows among the requested ids and locks them for
/// the rest of the transaction, so a concurrent order creation built
/// from overlapping ids waits here and then finds the rows gone.
///
/// Ids that do not exist or belong to another owner are silently
/// omitted. An empty snapshot is not an error at this layer; the order
/// writer decides to reject it.
pub async fn snapshot_for_update(
    conn: &mut PgConnection,
    owner_id: Uuid,
    cart_item_ids: &[i64],
) -> sqlx::Result<Vec<CartItem>> {
    if cart_item_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, CartItem>(
        "SELECT id, owner_id, schedule_id, quantity, unit_price, discount_price, kind
         FROM cart_items
         WHERE owner_id = $1 AND id = ANY($2)
         ORDER BY id
         FOR UPDATE",
    )
    .bind(owner_id)
    .bind(cart_item_ids)
    .fetch_all(conn)
    .await
}

/// Removes consumed rows once they are folded into an order.
pub async fn delete_items(conn: &mut PgConnection, cart_item_ids: &[i64]) -> sqlx::Result<u64> {
    if cart_item_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
        .bind(cart_item_ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Clears the caller's ephemeral buy-now rows after payment
/// confirmation, independent of which order they fed.
pub async fn purge_buy_now<'e, E>(executor: E, owner_id: Uuid) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM cart_items WHERE owner_id = $1 AND kind = $2")
        .bind(owner_id)
        .bind(KIND_BUY_NOW)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
