use serde::{Deserialize, Serialize};

use crate::{db_types::Order, ledger_api::cancellation_objects::CancellationDetails};

/// Published once an order has been cancelled and its ledger effects reconciled.
///
/// `order` is the order as stored after the status change. `details` reports how complete the reconciliation was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub initiator_id: String,
    pub reason: String,
    pub details: CancellationDetails,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, initiator_id: &str, reason: &str, details: CancellationDetails) -> Self {
        Self { order, initiator_id: initiator_id.to_string(), reason: reason.to_string(), details }
    }
}
