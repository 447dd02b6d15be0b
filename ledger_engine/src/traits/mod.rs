//! # Storage and collaborator contracts.
//!
//! This module defines the interfaces that the reconciliation engine depends on. The engine never talks to a database,
//! a message queue or a logging backend directly; it only uses these traits. The crate ships a SQLite backend
//! ([`crate::SqliteDatabase`]) that implements all of them.
//!
//! ## Ledger store
//! The ledger store is split into one trait per entity, mirroring the way the cancellation workflow touches the data:
//!
//! * [`OrderStore`] reads orders and performs versioned (compare-and-swap) writes on them.
//! * [`TransactionStore`] finds ledger entries for an order and appends new ones.
//! * [`WalletStore`] reads wallets, performs versioned writes, and can post a ledger entry together with its wallet
//!   update in a single storage transaction.
//! * [`PaymentStore`] marks the payment for an order as refunded.
//! * [`CancellationStore`] persists the cancellation audit record.
//!
//! [`LedgerDatabase`] ties them together and is what the APIs are generic over. [`LedgerQueries`] is the read-only
//! side used by operators and tests.
//!
//! ## Collaborators
//! * [`NotificationChannel`] delivers a message to a user.
//! * [`AuditSink`] records a security event.
//!
//! Failures from collaborators are never fatal to a cancellation.
mod collaborators;
mod ledger_database;
mod ledger_queries;

pub use collaborators::{AuditSink, DispatchError, NotificationChannel};
pub use ledger_database::{
    CancellationStore,
    LedgerDatabase,
    LedgerStoreError,
    OrderStore,
    PaymentStore,
    TransactionStore,
    WalletStore,
};
pub use ledger_queries::LedgerQueries;
