use log::{debug, trace};
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{NewWallet, Wallet, WalletUpdate},
    traits::LedgerStoreError,
};

pub async fn insert_wallet(wallet: NewWallet, conn: &mut SqliteConnection) -> Result<Wallet, LedgerStoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
            INSERT INTO wallets (user_id, balance, pending_balance, total_earnings)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, balance, pending_balance, total_earnings, version, created_at, updated_at;
        "#,
    )
    .bind(wallet.user_id)
    .bind(wallet.balance)
    .bind(wallet.pending_balance)
    .bind(wallet.total_earnings)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("wallets"))?;
    debug!("👛️ Created wallet #{} for {}", wallet.id, wallet.user_id);
    Ok(wallet)
}

pub async fn fetch_wallet(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, LedgerStoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
            SELECT id, user_id, balance, pending_balance, total_earnings, version, created_at, updated_at
            FROM wallets
            WHERE id = $1;
        "#,
    )
    .bind(wallet_id)
    .fetch_optional(conn)
    .await?;
    Ok(wallet)
}

pub async fn fetch_wallet_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, LedgerStoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
            SELECT id, user_id, balance, pending_balance, total_earnings, version, created_at, updated_at
            FROM wallets
            WHERE user_id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(wallet)
}

/// Compare-and-swap write of the wallet's monetary fields.
pub async fn update_wallet(update: WalletUpdate, conn: &mut SqliteConnection) -> Result<Wallet, LedgerStoreError> {
    if update.balance.is_negative() || update.pending_balance.is_negative() || update.total_earnings.is_negative() {
        return Err(LedgerStoreError::InvariantViolation(format!(
            "Wallet #{} cannot hold negative amounts (balance {}, pending {}, earnings {})",
            update.wallet_id, update.balance, update.pending_balance, update.total_earnings
        )));
    }
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
            UPDATE wallets
            SET balance = $1,
                pending_balance = $2,
                total_earnings = $3,
                version = version + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND version = $5
            RETURNING id, user_id, balance, pending_balance, total_earnings, version, created_at, updated_at;
        "#,
    )
    .bind(update.balance)
    .bind(update.pending_balance)
    .bind(update.total_earnings)
    .bind(update.wallet_id)
    .bind(update.expected_version)
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match wallet {
        Some(w) => {
            trace!(
                "👛️ Wallet #{} now has balance {}, pending {}, earnings {} (v{})",
                w.id,
                w.balance,
                w.pending_balance,
                w.total_earnings,
                w.version
            );
            Ok(w)
        },
        None => match fetch_wallet(update.wallet_id, conn).await? {
            Some(_) => Err(LedgerStoreError::VersionConflict {
                entity: format!("Wallet #{}", update.wallet_id),
                expected: update.expected_version,
            }),
            None => Err(LedgerStoreError::WalletNotFound(update.wallet_id)),
        },
    }
}
