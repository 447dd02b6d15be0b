use serde::{Deserialize, Serialize};

use crate::db_types::{AuditEvent, CancellationRecord, Money, Order, Payment, Transaction, Wallet};

/// An order together with everything the ledger knows about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistory {
    pub order: Order,
    pub transactions: Vec<Transaction>,
    pub cancellations: Vec<CancellationRecord>,
    pub payment: Option<Payment>,
    pub audit_events: Vec<AuditEvent>,
}

impl OrderHistory {
    pub fn new(order: Order) -> Self {
        Self { order, transactions: vec![], cancellations: vec![], payment: None, audit_events: vec![] }
    }

    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn with_cancellations(mut self, cancellations: Vec<CancellationRecord>) -> Self {
        self.cancellations = cancellations;
        self
    }

    pub fn with_payment(mut self, payment: Option<Payment>) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_audit_events(mut self, audit_events: Vec<AuditEvent>) -> Self {
        self.audit_events = audit_events;
        self
    }

    /// The sum of all ledger entries linked to the order. Zero once every earning has been reversed and nothing else
    /// was posted against it.
    pub fn net_amount(&self) -> Money {
        self.transactions.iter().map(|t| t.amount).sum()
    }
}

/// A wallet and its full ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHistory {
    pub wallet: Wallet,
    pub transactions: Vec<Transaction>,
}
