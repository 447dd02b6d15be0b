use thiserror::Error;

use crate::db_types::{
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
};

#[derive(Debug, Clone, Error)]
pub enum LedgerStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested wallet #{0} does not exist")]
    WalletNotFound(i64),
    #[error("There is no payment record for order {0}")]
    PaymentNotFound(OrderId),
    #[error("The requested transaction #{0} does not exist")]
    TransactionNotFound(i64),
    #[error("{entity} was modified concurrently (expected version {expected})")]
    VersionConflict { entity: String, expected: i64 },
    #[error("The write would violate a ledger invariant. {0}")]
    InvariantViolation(String),
    #[error("Transaction #{0} has already been reversed")]
    AlreadyReversed(i64),
}

impl LedgerStoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerStoreError::VersionConflict { .. })
    }
}

impl From<sqlx::Error> for LedgerStoreError {
    fn from(e: sqlx::Error) -> Self {
        LedgerStoreError::DatabaseError(e.to_string())
    }
}

/// Reading and transitioning orders.
///
/// Every write is a compare-and-swap against [`Order::version`], so that two workflows acting on the same order
/// cannot both believe they own it.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Fetches the order with the given id. If the order does not exist, `None` is returned.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerStoreError>;

    /// Takes ownership of the order for a multi-step workflow by bumping its version, provided the version still
    /// equals `expected_version`. Nothing else on the order changes.
    ///
    /// Returns the new version. If another writer got there first, [`LedgerStoreError::VersionConflict`] is returned.
    async fn claim_order(&self, order_id: &OrderId, expected_version: i64) -> Result<i64, LedgerStoreError>;

    /// Sets the status of the order and refreshes its `updated_at` timestamp, provided the version still equals
    /// `expected_version`.
    ///
    /// Returns the updated order.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        expected_version: i64,
    ) -> Result<Order, LedgerStoreError>;
}

/// Finding and appending ledger entries. Existing entries are never modified by this trait.
#[allow(async_fn_in_trait)]
pub trait TransactionStore {
    /// Fetches all transactions of the given type that are linked to the order, in storage order.
    async fn fetch_transactions_for_order(
        &self,
        order_id: &OrderId,
        tx_type: TransactionType,
    ) -> Result<Vec<Transaction>, LedgerStoreError>;

    /// Appends a ledger entry without touching any wallet.
    ///
    /// A second entry reversing the same transaction is rejected with [`LedgerStoreError::AlreadyReversed`].
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerStoreError>;

    /// Fetches the *current* settlement status of a transaction. A settlement job may have changed it since the
    /// transaction was first loaded. Returns `None` if the transaction does not exist.
    async fn fetch_transaction_status(&self, tx_id: i64) -> Result<Option<TransactionStatus>, LedgerStoreError>;

    /// Fetches the compensating entry that reverses `tx_id`, if there is one.
    async fn fetch_reversal_of(&self, tx_id: i64) -> Result<Option<Transaction>, LedgerStoreError>;
}

#[allow(async_fn_in_trait)]
pub trait WalletStore {
    /// Fetches the wallet owned by `user_id`, if there is one.
    async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerStoreError>;

    /// Fetches the wallet with the given id, if it exists.
    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerStoreError>;

    /// Overwrites the monetary fields of a wallet, provided its version still equals `update.expected_version`.
    ///
    /// Negative values are rejected with [`LedgerStoreError::InvariantViolation`].
    async fn update_wallet(&self, update: WalletUpdate) -> Result<Wallet, LedgerStoreError>;

    /// Appends `tx` to the ledger and applies `update` to its wallet in a single storage transaction. Either both
    /// writes happen or neither does.
    ///
    /// A version mismatch on the wallet yields [`LedgerStoreError::VersionConflict`], and a duplicate reversal yields
    /// [`LedgerStoreError::AlreadyReversed`]. In both cases nothing is written.
    async fn post_ledger_entry(
        &self,
        tx: NewTransaction,
        update: WalletUpdate,
    ) -> Result<(Transaction, Wallet), LedgerStoreError>;
}

#[allow(async_fn_in_trait)]
pub trait PaymentStore {
    /// Marks the payment for the order as refunded.
    ///
    /// If there is no payment for the order, [`LedgerStoreError::PaymentNotFound`] is returned.
    async fn mark_payment_refunded(&self, order_id: &OrderId) -> Result<Payment, LedgerStoreError>;
}

#[allow(async_fn_in_trait)]
pub trait CancellationStore {
    async fn insert_cancellation(&self, record: NewCancellationRecord) -> Result<CancellationRecord, LedgerStoreError>;
}

/// This trait defines the full set of storage behaviour needed by the cancellation workflow.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase:
    Clone + OrderStore + TransactionStore + WalletStore + PaymentStore + CancellationStore
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        Ok(())
    }
}
