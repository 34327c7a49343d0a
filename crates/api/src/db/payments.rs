//! Payment queries.

use sqlx::PgConnection;

use cartage_core::{
    LockedPayment, NewPayment, OrderId, PaymentId, PaymentStatus, ProviderName,
};

use super::{RepositoryError, parse_stored};

#[derive(sqlx::FromRow)]
struct LockedPaymentRow {
    id: PaymentId,
    order_id: OrderId,
    status: String,
}

/// Insert a payment, or return `None` if `(provider, provider_ref)` is taken.
pub(super) async fn insert(
    conn: &mut PgConnection,
    payment: &NewPayment,
) -> Result<Option<PaymentId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, PaymentId>(
        r"
        INSERT INTO payments (order_id, provider, provider_ref, status, amount)
        VALUES ($1, $2, $3, 'initiated', $4)
        ON CONFLICT (provider, provider_ref) DO NOTHING
        RETURNING id
        ",
    )
    .bind(payment.order_id)
    .bind(payment.provider.as_str())
    .bind(&payment.provider_ref)
    .bind(payment.amount.minor())
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Lock a payment by its provider key with `FOR UPDATE`.
pub(super) async fn lock(
    conn: &mut PgConnection,
    provider: &ProviderName,
    provider_ref: &str,
) -> Result<Option<LockedPayment>, RepositoryError> {
    let row = sqlx::query_as::<_, LockedPaymentRow>(
        r"
        SELECT id, order_id, status
        FROM payments
        WHERE provider = $1 AND provider_ref = $2
        FOR UPDATE
        ",
    )
    .bind(provider.as_str())
    .bind(provider_ref)
    .fetch_optional(conn)
    .await?;

    row.map(|r| {
        Ok(LockedPayment {
            id: r.id,
            order_id: r.order_id,
            status: parse_stored::<PaymentStatus>("payment status", &r.status)?,
        })
    })
    .transpose()
}

pub(super) async fn update(
    conn: &mut PgConnection,
    id: PaymentId,
    status: PaymentStatus,
    payload: &str,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE payments
        SET status = $1, payload = $2, updated_at = now()
        WHERE id = $3
        ",
    )
    .bind(status.as_str())
    .bind(payload)
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
