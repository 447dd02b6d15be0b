use std::time::Duration;

use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::LedgerStoreError,
};

/// Everything that can stop an order from being cancelled.
///
/// Only these surface to the caller. Failures after the order has been marked cancelled are logged and reported in
/// [`crate::ledger_api::cancellation_objects::CancellationDetails`] instead.
#[derive(Debug, Clone, Error)]
pub enum CancellationError {
    #[error("Order {0} does not exist")]
    NotFound(OrderId),
    #[error("User {user_id} is not a party to order {order_id}")]
    Unauthorized { order_id: OrderId, user_id: String },
    #[error("Order {order_id} cannot be cancelled because it is {status}")]
    InvalidState { order_id: OrderId, status: OrderStatusType },
    #[error("Order {0} is being modified by another request. Please try again.")]
    Conflict(OrderId),
    #[error("Could not cancel the order. {0}")]
    PersistenceFailure(String),
    #[error("Cancelling order {order_id} did not finish within {after:?}")]
    Timeout { order_id: OrderId, after: Duration },
}

impl CancellationError {
    /// Whether the same request may succeed if it is simply sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CancellationError::Conflict(_) | CancellationError::Timeout { .. })
    }
}

impl From<LedgerStoreError> for CancellationError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::OrderNotFound(id) => CancellationError::NotFound(id),
            e => CancellationError::PersistenceFailure(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No wallet exists for user {0}")]
    WalletNotFound(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
}

impl From<LedgerStoreError> for LedgerQueryError {
    fn from(e: LedgerStoreError) -> Self {
        LedgerQueryError::DatabaseError(e.to_string())
    }
}
