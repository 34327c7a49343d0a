//! Order ledger queries.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use sqlx::types::Json;

use cartage_core::{
    CartId, CurrencyCode, DraftItem, Money, Order, OrderDraft, OrderId, OrderItem, OrderItemId,
    OrderNumber, OrderStatus, OrderSummary, ShippingAddress, VariantId,
};

use super::{RepositoryError, parse_stored, unique_as_conflict};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    status: String,
    currency: String,
    subtotal: i64,
    discount_total: i64,
    shipping_total: i64,
    grand_total: i64,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    variant_id: VariantId,
    sku: String,
    name: String,
    unit_price: i64,
    qty: i32,
    line_total: i64,
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    status: String,
    currency: String,
    grand_total: i64,
}

/// Insert an order header, or return `None` if the order number is taken.
pub(super) async fn insert(
    conn: &mut PgConnection,
    cart: CartId,
    number: &OrderNumber,
    draft: &OrderDraft,
) -> Result<Option<OrderId>, RepositoryError> {
    // ON CONFLICT keeps the transaction usable so the caller can retry. A
    // second order for the same cart still fails on the cart_id key.
    let id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO orders (
            order_number, cart_id, status, currency,
            subtotal, discount_total, shipping_total, grand_total,
            shipping_address
        )
        VALUES ($1, $2, 'pending_payment', $3, $4, $5, $6, $7, $8)
        ON CONFLICT (order_number) DO NOTHING
        RETURNING id
        ",
    )
    .bind(number.as_str())
    .bind(cart)
    .bind(draft.currency.code())
    .bind(draft.subtotal.minor())
    .bind(draft.discount_total.minor())
    .bind(draft.shipping_total.minor())
    .bind(draft.grand_total.minor())
    .bind(Json(&draft.shipping_address))
    .fetch_optional(conn)
    .await
    .map_err(unique_as_conflict)?;

    Ok(id)
}

pub(super) async fn insert_items(
    conn: &mut PgConnection,
    order: OrderId,
    items: &[DraftItem],
) -> Result<(), RepositoryError> {
    for (position, item) in (0_i32..).zip(items) {
        sqlx::query(
            r"
            INSERT INTO order_items (
                order_id, position, variant_id, sku, name, unit_price, qty, line_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(order)
        .bind(position)
        .bind(item.variant_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.unit_price.minor())
        .bind(item.qty)
        .bind(item.line_total.minor())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(super) async fn get(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let Some(row) = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, order_number, status, currency,
               subtotal, discount_total, shipping_total, grand_total,
               shipping_address, created_at
        FROM orders
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT id, variant_id, sku, name, unit_price, qty, line_total
        FROM order_items
        WHERE order_id = $1
        ORDER BY position ASC
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Order {
        id: row.id,
        order_number: OrderNumber::from_stored(row.order_number),
        status: parse_stored("order status", &row.status)?,
        currency: parse_stored("currency", &row.currency)?,
        subtotal: Money::from_minor(row.subtotal),
        discount_total: Money::from_minor(row.discount_total),
        shipping_total: Money::from_minor(row.shipping_total),
        grand_total: Money::from_minor(row.grand_total),
        shipping_address: row.shipping_address.0,
        items: items
            .into_iter()
            .map(|r| OrderItem {
                id: r.id,
                variant_id: r.variant_id,
                sku: r.sku,
                name: r.name,
                unit_price: Money::from_minor(r.unit_price),
                qty: r.qty,
                line_total: Money::from_minor(r.line_total),
            })
            .collect(),
        created_at: row.created_at,
    }))
}

/// Read the payable fields of an order with `FOR SHARE`.
pub(super) async fn lock_summary(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderSummary>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderSummaryRow>(
        r"
        SELECT status, currency, grand_total
        FROM orders
        WHERE id = $1
        FOR SHARE
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(|r| {
        Ok(OrderSummary {
            status: parse_stored::<OrderStatus>("order status", &r.status)?,
            currency: parse_stored::<CurrencyCode>("currency", &r.currency)?,
            grand_total: Money::from_minor(r.grand_total),
        })
    })
    .transpose()
}

/// Guarded status transition. Returns whether the row changed.
pub(super) async fn compare_and_set_status(
    conn: &mut PgConnection,
    id: OrderId,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE orders
        SET status = $1, updated_at = now()
        WHERE id = $2 AND status = $3
        ",
    )
    .bind(next.as_str())
    .bind(id)
    .bind(expected.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
