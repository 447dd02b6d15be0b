use log::debug;
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{CancellationRecord, NewCancellationRecord, OrderId},
    traits::LedgerStoreError,
};

pub async fn insert_cancellation(
    record: NewCancellationRecord,
    conn: &mut SqliteConnection,
) -> Result<CancellationRecord, LedgerStoreError> {
    let record = sqlx::query_as::<_, CancellationRecord>(
        r#"
            INSERT INTO order_cancellations (order_id, reason, cancelled_by) VALUES ($1, $2, $3)
            RETURNING id, order_id, reason, cancelled_by, created_at;
        "#,
    )
    .bind(record.order_id)
    .bind(record.reason)
    .bind(record.cancelled_by)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("order_cancellations"))?;
    debug!("📝️ Cancellation of order {} by {} recorded", record.order_id, record.cancelled_by);
    Ok(record)
}

pub async fn fetch_cancellations_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CancellationRecord>, LedgerStoreError> {
    let records = sqlx::query_as::<_, CancellationRecord>(
        r#"
            SELECT id, order_id, reason, cancelled_by, created_at
            FROM order_cancellations
            WHERE order_id = $1
            ORDER BY id ASC;
        "#,
    )
    .bind(*order_id)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
