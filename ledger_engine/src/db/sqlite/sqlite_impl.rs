//! `SqliteDatabase` is a concrete implementation of a ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module, including the notification channel and audit sink, which are written to their own tables.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{cancellations, collaborators, db_url, new_pool, orders, payments, transactions, wallets};
use crate::{
    db_types::{
        AuditEvent,
        CancellationRecord,
        Money,
        NewAuditEvent,
        NewCancellationRecord,
        NewNotification,
        NewOrder,
        NewPayment,
        NewTransaction,
        NewWallet,
        Notification,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        Transaction,
        TransactionStatus,
        TransactionType,
        Wallet,
        WalletUpdate,
    },
    traits::{
        AuditSink,
        CancellationStore,
        DispatchError,
        LedgerDatabase,
        LedgerQueries,
        LedgerStoreError,
        NotificationChannel,
        OrderStore,
        PaymentStore,
        TransactionStore,
        WalletStore,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn claim_order(&self, order_id: &OrderId, expected_version: i64) -> Result<i64, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::claim_order(order_id, expected_version, &mut conn).await
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        expected_version: i64,
    ) -> Result<Order, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_id, status, expected_version, &mut conn).await
    }
}

impl TransactionStore for SqliteDatabase {
    async fn fetch_transactions_for_order(
        &self,
        order_id: &OrderId,
        tx_type: TransactionType,
    ) -> Result<Vec<Transaction>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions_for_order(order_id, Some(tx_type), &mut conn).await
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_transaction(tx, &mut conn).await
    }

    async fn fetch_transaction_status(&self, tx_id: i64) -> Result<Option<TransactionStatus>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction_status(tx_id, &mut conn).await
    }

    async fn fetch_reversal_of(&self, tx_id: i64) -> Result<Option<Transaction>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_reversal_of(tx_id, &mut conn).await
    }
}

impl WalletStore for SqliteDatabase {
    async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet_for_user(user_id, &mut conn).await
    }

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet(wallet_id, &mut conn).await
    }

    async fn update_wallet(&self, update: WalletUpdate) -> Result<Wallet, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        wallets::update_wallet(update, &mut conn).await
    }

    async fn post_ledger_entry(
        &self,
        tx: NewTransaction,
        update: WalletUpdate,
    ) -> Result<(Transaction, Wallet), LedgerStoreError> {
        if tx.wallet_id != update.wallet_id {
            return Err(LedgerStoreError::InvariantViolation(format!(
                "Ledger entry for wallet #{} cannot update wallet #{}",
                tx.wallet_id, update.wallet_id
            )));
        }
        let mut db_tx = self.pool.begin().await?;
        let record = transactions::insert_transaction(tx, &mut db_tx).await?;
        // Dropping `db_tx` on an early return rolls back the insert above
        let wallet = wallets::update_wallet(update, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!("🗃️ Ledger entry #{} posted and wallet #{} updated atomically", record.id, wallet.id);
        Ok((record, wallet))
    }
}

impl PaymentStore for SqliteDatabase {
    async fn mark_payment_refunded(&self, order_id: &OrderId) -> Result<Payment, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::mark_payment_refunded(order_id, &mut conn).await
    }
}

impl CancellationStore for SqliteDatabase {
    async fn insert_cancellation(&self, record: NewCancellationRecord) -> Result<CancellationRecord, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        cancellations::insert_cancellation(record, &mut conn).await
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerQueries for SqliteDatabase {
    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(order_number, &mut conn).await
    }

    async fn fetch_order_transactions(&self, order_id: &OrderId) -> Result<Vec<Transaction>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions_for_order(order_id, None, &mut conn).await
    }

    async fn fetch_wallet_transactions(&self, wallet_id: i64) -> Result<Vec<Transaction>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions_for_wallet(wallet_id, &mut conn).await
    }

    async fn fetch_cancellations_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<CancellationRecord>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        cancellations::fetch_cancellations_for_order(order_id, &mut conn).await
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_for_order(order_id, &mut conn).await
    }

    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        collaborators::fetch_notifications_for_user(user_id, &mut conn).await
    }

    async fn fetch_audit_events_for_order(&self, order_id: &OrderId) -> Result<Vec<AuditEvent>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        collaborators::fetch_audit_events_for_order(order_id, &mut conn).await
    }
}

impl NotificationChannel for SqliteDatabase {
    async fn send_notification(&self, notification: NewNotification) -> Result<(), DispatchError> {
        let user_id = notification.user_id.clone();
        let to_dispatch_error = |e: LedgerStoreError| DispatchError::NotificationFailed {
            user_id: user_id.clone(),
            reason: e.to_string(),
        };
        let mut conn = self.pool.acquire().await.map_err(|e| to_dispatch_error(e.into()))?;
        collaborators::insert_notification(notification, &mut conn).await.map_err(to_dispatch_error)?;
        Ok(())
    }
}

impl AuditSink for SqliteDatabase {
    async fn record_audit_event(&self, event: NewAuditEvent) -> Result<(), DispatchError> {
        let mut conn = self.pool.acquire().await.map_err(|e| DispatchError::AuditFailed(e.to_string()))?;
        collaborators::insert_audit_event(event, &mut conn).await.map_err(|e| DispatchError::AuditFailed(e.to_string()))?;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `LEDGER_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerStoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn run_migrations(&self) -> Result<(), LedgerStoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerStoreError::DatabaseError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    //------------------------------------  Purchase-side setup  ------------------------------------------------------
    // The purchase and settlement flows live in the web application. These methods let tools and tests seed the
    // ledger with the state those flows would have produced.

    pub async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    pub async fn insert_wallet(&self, wallet: NewWallet) -> Result<Wallet, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        wallets::insert_wallet(wallet, &mut conn).await
    }

    pub async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    /// Credits the order's freelancer with an earning, the way the order-completion flow does: a settled earning
    /// lands in `balance`, a pending one in `pending_balance`, and either way `total_earnings` grows.
    pub async fn record_earning(
        &self,
        order: &Order,
        amount: Money,
        status: TransactionStatus,
    ) -> Result<(Transaction, Wallet), LedgerStoreError> {
        let wallet = self.fetch_wallet_for_user(&order.freelancer_id).await?.ok_or_else(|| {
            LedgerStoreError::InvariantViolation(format!("Freelancer {} has no wallet", order.freelancer_id))
        })?;
        let earning = NewTransaction::new(wallet.id, amount, TransactionType::Earning, status)
            .for_order(order)
            .with_description(format!("Earning for order {}", order.order_number));
        let mut update = WalletUpdate {
            wallet_id: wallet.id,
            expected_version: wallet.version,
            balance: wallet.balance,
            pending_balance: wallet.pending_balance,
            total_earnings: wallet.total_earnings.saturating_add(amount),
        };
        if status.is_settled() {
            update.balance = wallet.balance.saturating_add(amount);
        } else {
            update.pending_balance = wallet.pending_balance.saturating_add(amount);
        }
        self.post_ledger_entry(earning, update).await
    }

    /// Settles a pending transaction: the transaction is marked `completed` and its amount moves from the wallet's
    /// pending balance to its settled balance, in a single storage transaction.
    ///
    /// Settling an already-completed transaction is a no-op.
    pub async fn settle_transaction(&self, tx_id: i64) -> Result<Transaction, LedgerStoreError> {
        let mut db_tx = self.pool.begin().await?;
        let tx = transactions::fetch_transaction(tx_id, &mut db_tx)
            .await?
            .ok_or(LedgerStoreError::TransactionNotFound(tx_id))?;
        if tx.status.is_settled() {
            debug!("🗃️ Transaction #{tx_id} is already settled. Nothing to do");
            return Ok(tx);
        }
        let wallet =
            wallets::fetch_wallet(tx.wallet_id, &mut db_tx).await?.ok_or(LedgerStoreError::WalletNotFound(tx.wallet_id))?;
        let settled = transactions::mark_transaction_completed(tx_id, &mut db_tx).await?;
        let (pending_balance, clamped) = wallet.pending_balance.sub_floor_zero(tx.amount);
        if clamped {
            warn!(
                "🗃️ Wallet #{} held only {} pending while settling transaction #{tx_id} of {}",
                wallet.id, wallet.pending_balance, tx.amount
            );
        }
        let update = WalletUpdate {
            wallet_id: wallet.id,
            expected_version: wallet.version,
            balance: wallet.balance.saturating_add(tx.amount),
            pending_balance,
            total_earnings: wallet.total_earnings,
        };
        wallets::update_wallet(update, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!("🗃️ Transaction #{tx_id} settled into wallet #{}", wallet.id);
        Ok(settled)
    }
}
