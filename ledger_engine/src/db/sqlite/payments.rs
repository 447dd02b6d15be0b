use log::debug;
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentStatus},
    traits::LedgerStoreError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, LedgerStoreError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
            INSERT INTO payments (order_id, amount, status) VALUES ($1, $2, $3)
            RETURNING id, order_id, amount, status, created_at, updated_at;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(PaymentStatus::Paid)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("payments"))?;
    debug!("💳️ Payment #{} of {} recorded for order {}", payment.id, payment.amount, payment.order_id);
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, LedgerStoreError> {
    let payment = sqlx::query_as::<_, Payment>(
        "SELECT id, order_id, amount, status, created_at, updated_at FROM payments WHERE order_id = $1",
    )
    .bind(*order_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn mark_payment_refunded(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Payment, LedgerStoreError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
            UPDATE payments
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2
            RETURNING id, order_id, amount, status, created_at, updated_at;
        "#,
    )
    .bind(PaymentStatus::Refunded)
    .bind(*order_id)
    .fetch_all(conn)
    .await?
    .pop();
    let payment = payment.ok_or(LedgerStoreError::PaymentNotFound(*order_id))?;
    debug!("💳️ Payment #{} for order {order_id} marked as refunded", payment.id);
    Ok(payment)
}
