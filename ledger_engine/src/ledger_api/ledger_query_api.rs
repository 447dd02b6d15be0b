//! Read-only access to ledger history.

use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{Notification, Order, OrderId},
    ledger_api::{
        errors::LedgerQueryError,
        history_objects::{OrderHistory, WalletHistory},
    },
    traits::{LedgerQueries, OrderStore, WalletStore},
};

/// The `LedgerQueryApi` lets operators inspect orders and wallets, e.g. to check a cancellation after the fact.
pub struct LedgerQueryApi<B> {
    db: B,
}

impl<B: Debug> Debug for LedgerQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerQueryApi ({:?})", self.db)
    }
}

impl<B> LedgerQueryApi<B>
where B: LedgerQueries + OrderStore + WalletStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerQueryError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, LedgerQueryError> {
        Ok(self.db.fetch_order_by_number(order_number).await?)
    }

    /// Fetches the order with every transaction, cancellation record, payment and audit event linked to it.
    pub async fn order_history(&self, order_id: &OrderId) -> Result<OrderHistory, LedgerQueryError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| LedgerQueryError::OrderNotFound(order_id.to_string()))?;
        let transactions = self.db.fetch_order_transactions(order_id).await?;
        trace!("{} transactions found for order {order_id}", transactions.len());
        let cancellations = self.db.fetch_cancellations_for_order(order_id).await?;
        let payment = self.db.fetch_payment_for_order(order_id).await?;
        let audit_events = self.db.fetch_audit_events_for_order(order_id).await?;
        Ok(OrderHistory::new(order)
            .with_transactions(transactions)
            .with_cancellations(cancellations)
            .with_payment(payment)
            .with_audit_events(audit_events))
    }

    /// Fetches the user's wallet and its full ledger. Fails with [`LedgerQueryError::WalletNotFound`] if the user has
    /// no wallet.
    pub async fn wallet_history(&self, user_id: &str) -> Result<WalletHistory, LedgerQueryError> {
        let wallet = self
            .db
            .fetch_wallet_for_user(user_id)
            .await?
            .ok_or_else(|| LedgerQueryError::WalletNotFound(user_id.to_string()))?;
        let transactions = self.db.fetch_wallet_transactions(wallet.id).await?;
        Ok(WalletHistory { wallet, transactions })
    }

    pub async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, LedgerQueryError> {
        Ok(self.db.fetch_notifications_for_user(user_id).await?)
    }
}
