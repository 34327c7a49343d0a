//! Cart queries.
//!
//! Functions take a bare connection so they can run either on a pooled
//! connection or inside an open transaction.

use sqlx::PgConnection;

use cartage_core::{
    Cart, CartId, CartItem, CartItemId, CartStatus, Money, PricedLine, VariantId,
};

use super::{RepositoryError, foreign_key_as_not_found, parse_stored};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    status: String,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    variant_id: VariantId,
    qty: i32,
}

#[derive(sqlx::FromRow)]
struct PricedLineRow {
    variant_id: VariantId,
    sku: String,
    name: String,
    price: i64,
    qty: i32,
}

pub(super) async fn create(conn: &mut PgConnection) -> Result<CartId, RepositoryError> {
    let id = sqlx::query_scalar::<_, CartId>(r"INSERT INTO carts DEFAULT VALUES RETURNING id")
        .fetch_one(conn)
        .await?;
    Ok(id)
}

pub(super) async fn get(
    conn: &mut PgConnection,
    id: CartId,
) -> Result<Option<Cart>, RepositoryError> {
    let Some(row) = sqlx::query_as::<_, CartRow>(r"SELECT id, status FROM carts WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, CartItemRow>(
        r"
        SELECT id, variant_id, qty
        FROM cart_items
        WHERE cart_id = $1
        ORDER BY created_at ASC, id ASC
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Cart {
        id: row.id,
        status: parse_stored("cart status", &row.status)?,
        items: items
            .into_iter()
            .map(|r| CartItem {
                id: r.id,
                variant_id: r.variant_id,
                qty: r.qty,
            })
            .collect(),
    }))
}

/// Lock a cart row with `FOR UPDATE`.
pub(super) async fn lock(
    conn: &mut PgConnection,
    id: CartId,
) -> Result<Option<CartStatus>, RepositoryError> {
    let status = sqlx::query_scalar::<_, String>(r"SELECT status FROM carts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    status
        .map(|s| parse_stored("cart status", &s))
        .transpose()
}

/// Lock a cart and fail unless it is still active.
async fn lock_active(conn: &mut PgConnection, id: CartId) -> Result<(), RepositoryError> {
    match lock(conn, id).await? {
        Some(CartStatus::Active) => Ok(()),
        Some(CartStatus::Converted) | None => Err(RepositoryError::NotFound),
    }
}

/// Cart lines joined with active variants of active products.
pub(super) async fn priced_lines(
    conn: &mut PgConnection,
    cart: CartId,
) -> Result<Vec<PricedLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, PricedLineRow>(
        r"
        SELECT ci.variant_id, v.sku, v.name, v.price, ci.qty
        FROM cart_items ci
        JOIN product_variants v ON v.id = ci.variant_id
        JOIN products p ON p.id = v.product_id
        WHERE ci.cart_id = $1 AND v.is_active AND p.is_active
        ORDER BY ci.created_at ASC, ci.id ASC
        ",
    )
    .bind(cart)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| PricedLine {
            variant_id: r.variant_id,
            sku: r.sku,
            name: r.name,
            unit_price: Money::from_minor(r.price),
            qty: r.qty,
        })
        .collect())
}

pub(super) async fn mark_converted(
    conn: &mut PgConnection,
    id: CartId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE carts
        SET status = 'converted', updated_at = now()
        WHERE id = $1 AND status = 'active'
        ",
    )
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub(super) async fn upsert_item(
    conn: &mut PgConnection,
    cart: CartId,
    variant: VariantId,
    qty: i32,
) -> Result<CartItemId, RepositoryError> {
    lock_active(conn, cart).await?;

    let id = sqlx::query_scalar::<_, CartItemId>(
        r"
        INSERT INTO cart_items (cart_id, variant_id, qty)
        VALUES ($1, $2, $3)
        ON CONFLICT (cart_id, variant_id)
        DO UPDATE SET qty = EXCLUDED.qty, updated_at = now()
        RETURNING id
        ",
    )
    .bind(cart)
    .bind(variant)
    .bind(qty)
    .fetch_one(conn)
    .await
    .map_err(foreign_key_as_not_found)?;

    Ok(id)
}

pub(super) async fn update_item_qty(
    conn: &mut PgConnection,
    cart: CartId,
    item: CartItemId,
    qty: i32,
) -> Result<(), RepositoryError> {
    lock_active(conn, cart).await?;

    let result = sqlx::query(
        r"
        UPDATE cart_items
        SET qty = $1, updated_at = now()
        WHERE id = $2 AND cart_id = $3
        ",
    )
    .bind(qty)
    .bind(item)
    .bind(cart)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub(super) async fn delete_item(
    conn: &mut PgConnection,
    cart: CartId,
    item: CartItemId,
) -> Result<(), RepositoryError> {
    lock_active(conn, cart).await?;

    let result = sqlx::query(r"DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item)
        .bind(cart)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
