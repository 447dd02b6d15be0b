use log::trace;
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{NewTransaction, OrderId, Transaction, TransactionStatus, TransactionType},
    traits::LedgerStoreError,
};

/// Appends a ledger entry. This is not atomic; pass `&mut *tx` to embed it in a storage transaction.
///
/// A second compensating entry for the same transaction fails with [`LedgerStoreError::AlreadyReversed`].
pub async fn insert_transaction(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, LedgerStoreError> {
    let reverses_tx_id = tx.reverses_tx_id;
    let record = sqlx::query_as::<_, Transaction>(
        r#"
            INSERT INTO transactions (
                wallet_id,
                amount,
                tx_type,
                status,
                order_id,
                client_id,
                freelancer_id,
                service_id,
                description,
                reverses_tx_id,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                description, reverses_tx_id, completed_at, created_at;
        "#,
    )
    .bind(tx.wallet_id)
    .bind(tx.amount)
    .bind(tx.tx_type)
    .bind(tx.status)
    .bind(tx.order_id)
    .bind(tx.client_id)
    .bind(tx.freelancer_id)
    .bind(tx.service_id)
    .bind(tx.description)
    .bind(tx.reverses_tx_id)
    .bind(tx.completed_at)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        let duplicate = matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        match reverses_tx_id {
            Some(id) if duplicate => LedgerStoreError::AlreadyReversed(id),
            _ => e.into(),
        }
    })?
    .pop()
    .ok_or_else(|| no_row_returned("transactions"))?;
    trace!("🧾️ Recorded {} transaction #{} of {} in wallet #{}", record.tx_type, record.id, record.amount, record.wallet_id);
    Ok(record)
}

pub async fn fetch_transaction(tx_id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, LedgerStoreError> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
            SELECT id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                description, reverses_tx_id, completed_at, created_at
            FROM transactions
            WHERE id = $1;
        "#,
    )
    .bind(tx_id)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

pub async fn fetch_transaction_status(
    tx_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<TransactionStatus>, LedgerStoreError> {
    let status = sqlx::query_scalar::<_, TransactionStatus>("SELECT status FROM transactions WHERE id = $1")
        .bind(tx_id)
        .fetch_optional(conn)
        .await?;
    Ok(status)
}

/// Fetches the compensating entry that reverses `tx_id`, if one has been posted.
pub async fn fetch_reversal_of(tx_id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, LedgerStoreError> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
            SELECT id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                description, reverses_tx_id, completed_at, created_at
            FROM transactions
            WHERE reverses_tx_id = $1;
        "#,
    )
    .bind(tx_id)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Fetches transactions linked to the order, optionally restricted to a single type. Results are in insertion order.
pub async fn fetch_transactions_for_order(
    order_id: &OrderId,
    tx_type: Option<TransactionType>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, LedgerStoreError> {
    let txs = match tx_type {
        Some(tx_type) => {
            sqlx::query_as::<_, Transaction>(
                r#"
                SELECT id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                    description, reverses_tx_id, completed_at, created_at
                FROM transactions
                WHERE order_id = $1 AND tx_type = $2
                ORDER BY id ASC;
            "#,
            )
            .bind(*order_id)
            .bind(tx_type)
            .fetch_all(conn)
            .await?
        },
        None => {
            sqlx::query_as::<_, Transaction>(
                r#"
                SELECT id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                    description, reverses_tx_id, completed_at, created_at
                FROM transactions
                WHERE order_id = $1
                ORDER BY id ASC;
            "#,
            )
            .bind(*order_id)
            .fetch_all(conn)
            .await?
        },
    };
    trace!("🧾️ {} transactions found for order {order_id}", txs.len());
    Ok(txs)
}

pub async fn fetch_transactions_for_wallet(
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, LedgerStoreError> {
    let txs = sqlx::query_as::<_, Transaction>(
        r#"
            SELECT id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                description, reverses_tx_id, completed_at, created_at
            FROM transactions
            WHERE wallet_id = $1
            ORDER BY id ASC;
        "#,
    )
    .bind(wallet_id)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}

/// Marks a pending transaction as completed. Used by the settlement flow, never by a reversal.
pub async fn mark_transaction_completed(tx_id: i64, conn: &mut SqliteConnection) -> Result<Transaction, LedgerStoreError> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
            UPDATE transactions
            SET status = $1, completed_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING id, wallet_id, amount, tx_type, status, order_id, client_id, freelancer_id, service_id,
                description, reverses_tx_id, completed_at, created_at;
        "#,
    )
    .bind(TransactionStatus::Completed)
    .bind(tx_id)
    .bind(TransactionStatus::Pending)
    .fetch_all(conn)
    .await?
    .pop();
    tx.ok_or(LedgerStoreError::TransactionNotFound(tx_id))
}
