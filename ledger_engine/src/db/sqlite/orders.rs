use log::{debug, trace};
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::LedgerStoreError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerStoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_number,
                client_id,
                freelancer_id,
                service_id,
                status,
                price,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, order_number, client_id, freelancer_id, service_id, status, price, currency, version,
                created_at, updated_at;
        "#,
    )
    .bind(order.order_number)
    .bind(order.client_id)
    .bind(order.freelancer_id)
    .bind(order.service_id)
    .bind(order.status)
    .bind(order.price)
    .bind(order.currency)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("orders"))?;
    debug!("📦️ Order {} ({}) saved with status {}", order.id, order.order_number, order.status);
    Ok(order)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerStoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, order_number, client_id, freelancer_id, service_id, status, price, currency, version,
                created_at, updated_at
            FROM orders
            WHERE id = $1;
        "#,
    )
    .bind(*order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerStoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, order_number, client_id, freelancer_id, service_id, status, price, currency, version,
                created_at, updated_at
            FROM orders
            WHERE order_number = $1;
        "#,
    )
    .bind(order_number)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Bumps the order version if it still equals `expected_version`. Returns the new version.
pub async fn claim_order(
    order_id: &OrderId,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, LedgerStoreError> {
    let version: Option<i64> =
        sqlx::query_scalar("UPDATE orders SET version = version + 1 WHERE id = $1 AND version = $2 RETURNING version")
            .bind(*order_id)
            .bind(expected_version)
            .fetch_all(&mut *conn)
            .await?
            .pop();
    match version {
        Some(v) => {
            trace!("📦️ Order {order_id} claimed. Version {expected_version} -> {v}");
            Ok(v)
        },
        None => Err(missing_or_conflict(order_id, expected_version, conn).await),
    }
}

pub async fn update_order_status(
    order_id: &OrderId,
    status: OrderStatusType,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerStoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders
            SET status = $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND version = $3
            RETURNING id, order_number, client_id, freelancer_id, service_id, status, price, currency, version,
                created_at, updated_at;
        "#,
    )
    .bind(status)
    .bind(*order_id)
    .bind(expected_version)
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(o) => {
            debug!("📦️ Order {order_id} status updated to {status}");
            Ok(o)
        },
        None => Err(missing_or_conflict(order_id, expected_version, conn).await),
    }
}

/// A versioned write touched no rows. Works out whether that is because the order is gone or because someone else
/// wrote to it first.
async fn missing_or_conflict(order_id: &OrderId, expected_version: i64, conn: &mut SqliteConnection) -> LedgerStoreError {
    match fetch_order(order_id, conn).await {
        Ok(Some(_)) => LedgerStoreError::VersionConflict { entity: format!("Order {order_id}"), expected: expected_version },
        Ok(None) => LedgerStoreError::OrderNotFound(*order_id),
        Err(e) => e,
    }
}
