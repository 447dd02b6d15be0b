use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use ledger_engine::{
    db_types::{
        CancellationRecord,
        NewCancellationRecord,
        NewTransaction,
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
        CancellationStore,
        LedgerDatabase,
        LedgerStoreError,
        OrderStore,
        PaymentStore,
        TransactionStore,
        WalletStore,
    },
    SqliteDatabase,
};

/// Wraps a real database and injects faults into selected calls. Everything else is passed through.
#[derive(Clone)]
pub struct FaultyDatabase {
    pub inner: SqliteDatabase,
    pub fail_status_update: bool,
    pub settle_after_load: bool,
    pub slow_earnings_lookup: Option<Duration>,
    pub slow_cancellation_record: Option<Duration>,
    /// Number of upcoming ledger postings that will find their wallet modified by someone else.
    pub wallet_conflicts: Arc<AtomicUsize>,
}

impl FaultyDatabase {
    pub fn new(inner: SqliteDatabase) -> Self {
        Self {
            inner,
            fail_status_update: false,
            settle_after_load: false,
            slow_earnings_lookup: None,
            slow_cancellation_record: None,
            wallet_conflicts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_status_update(mut self) -> Self {
        self.fail_status_update = true;
        self
    }

    pub fn settling_after_load(mut self) -> Self {
        self.settle_after_load = true;
        self
    }

    pub fn with_slow_earnings_lookup(mut self, delay: Duration) -> Self {
        self.slow_earnings_lookup = Some(delay);
        self
    }

    pub fn with_slow_cancellation_record(mut self, delay: Duration) -> Self {
        self.slow_cancellation_record = Some(delay);
        self
    }

    pub fn with_wallet_conflicts(self, count: usize) -> Self {
        self.wallet_conflicts.store(count, Ordering::SeqCst);
        self
    }

    /// Simulates a concurrent writer by rewriting the wallet with its current values, which bumps its version.
    async fn touch_wallet(&self, wallet_id: i64) -> Result<(), LedgerStoreError> {
        let wallet = self.inner.fetch_wallet(wallet_id).await?.ok_or(LedgerStoreError::WalletNotFound(wallet_id))?;
        let update = WalletUpdate {
            wallet_id,
            expected_version: wallet.version,
            balance: wallet.balance,
            pending_balance: wallet.pending_balance,
            total_earnings: wallet.total_earnings,
        };
        self.inner.update_wallet(update).await?;
        Ok(())
    }
}

impl OrderStore for FaultyDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerStoreError> {
        self.inner.fetch_order(order_id).await
    }

    async fn claim_order(&self, order_id: &OrderId, expected_version: i64) -> Result<i64, LedgerStoreError> {
        self.inner.claim_order(order_id, expected_version).await
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        expected_version: i64,
    ) -> Result<Order, LedgerStoreError> {
        if self.fail_status_update {
            return Err(LedgerStoreError::DatabaseError("disk I/O error".to_string()));
        }
        self.inner.update_order_status(order_id, status, expected_version).await
    }
}

impl TransactionStore for FaultyDatabase {
    async fn fetch_transactions_for_order(
        &self,
        order_id: &OrderId,
        tx_type: TransactionType,
    ) -> Result<Vec<Transaction>, LedgerStoreError> {
        if let Some(delay) = self.slow_earnings_lookup {
            tokio::time::sleep(delay).await;
        }
        let txs = self.inner.fetch_transactions_for_order(order_id, tx_type).await?;
        if self.settle_after_load {
            for tx in txs.iter().filter(|t| t.status == TransactionStatus::Pending) {
                self.inner.settle_transaction(tx.id).await?;
            }
        }
        Ok(txs)
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerStoreError> {
        self.inner.insert_transaction(tx).await
    }

    async fn fetch_transaction_status(&self, tx_id: i64) -> Result<Option<TransactionStatus>, LedgerStoreError> {
        self.inner.fetch_transaction_status(tx_id).await
    }

    async fn fetch_reversal_of(&self, tx_id: i64) -> Result<Option<Transaction>, LedgerStoreError> {
        self.inner.fetch_reversal_of(tx_id).await
    }
}

impl WalletStore for FaultyDatabase {
    async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerStoreError> {
        self.inner.fetch_wallet_for_user(user_id).await
    }

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerStoreError> {
        self.inner.fetch_wallet(wallet_id).await
    }

    async fn update_wallet(&self, update: WalletUpdate) -> Result<Wallet, LedgerStoreError> {
        self.inner.update_wallet(update).await
    }

    async fn post_ledger_entry(
        &self,
        tx: NewTransaction,
        update: WalletUpdate,
    ) -> Result<(Transaction, Wallet), LedgerStoreError> {
        let conflict =
            self.wallet_conflicts.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if conflict {
            self.touch_wallet(update.wallet_id).await?;
        }
        self.inner.post_ledger_entry(tx, update).await
    }
}

impl PaymentStore for FaultyDatabase {
    async fn mark_payment_refunded(&self, order_id: &OrderId) -> Result<Payment, LedgerStoreError> {
        self.inner.mark_payment_refunded(order_id).await
    }
}

impl CancellationStore for FaultyDatabase {
    async fn insert_cancellation(&self, record: NewCancellationRecord) -> Result<CancellationRecord, LedgerStoreError> {
        if let Some(delay) = self.slow_cancellation_record {
            tokio::time::sleep(delay).await;
        }
        self.inner.insert_cancellation(record).await
    }
}

impl LedgerDatabase for FaultyDatabase {
    fn url(&self) -> &str {
        self.inner.url()
    }
}
