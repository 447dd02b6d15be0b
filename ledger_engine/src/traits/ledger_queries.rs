use crate::{
    db_types::{AuditEvent, CancellationRecord, Notification, Order, OrderId, Payment, Transaction},
    traits::LedgerStoreError,
};

/// The `LedgerQueries` trait provides read-only access to ledger history: everything an operator needs to check that
/// a cancellation reconciled correctly.
///
/// The [`crate::traits::LedgerDatabase`] traits handle the actual machinery of the cancellation workflow.
#[allow(async_fn_in_trait)]
pub trait LedgerQueries {
    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, LedgerStoreError>;

    /// Fetches every transaction linked to the order, of any type, in storage order.
    async fn fetch_order_transactions(&self, order_id: &OrderId) -> Result<Vec<Transaction>, LedgerStoreError>;

    async fn fetch_wallet_transactions(&self, wallet_id: i64) -> Result<Vec<Transaction>, LedgerStoreError>;

    async fn fetch_cancellations_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<CancellationRecord>, LedgerStoreError>;

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, LedgerStoreError>;

    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, LedgerStoreError>;

    async fn fetch_audit_events_for_order(&self, order_id: &OrderId) -> Result<Vec<AuditEvent>, LedgerStoreError>;
}
