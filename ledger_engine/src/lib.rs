//! Marketplace Ledger Engine
//!
//! When a marketplace order is placed, money moves: the freelancer accrues an earning and the client is charged. If
//! the order is later cancelled, all of that has to be unwound without ever leaving a wallet negative, and without a
//! failing notification or audit write undoing the cancellation itself. This library contains that reconciliation
//! logic. It is storage-agnostic.
//!
//! The library is divided into the following sections:
//! 1. Storage and collaborator contracts ([`mod@traits`]) and the SQLite backend that implements them
//!    ([`SqliteDatabase`]). The data types used in the database are defined in the [`mod@db_types`] module and are
//!    public.
//! 2. The reconciliation building blocks ([`mod@reconciliation`]): the pure wallet balance calculator, the transaction
//!    reversal engine and the side-effect dispatcher.
//! 3. The public API ([`mod@ledger_api`]). [`CancellationApi`] runs the cancellation workflow, [`LedgerQueryApi`]
//!    provides read-only access to ledger history.
//!
//! The engine also emits events that can be subscribed to. When an order has been cancelled, an
//! [`events::OrderCancelledEvent`] is published to every registered hook.
mod db;

pub mod db_types;
pub mod events;
pub mod ledger_api;
pub mod reconciliation;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, SqliteDatabase};
pub use ledger_api::{
    cancellation_api::CancellationApi,
    cancellation_objects::{
        CancellationDetails,
        CancellationOptions,
        CancellationOutcome,
        CancellationResponse,
        DEFAULT_CANCELLATION_REASON,
    },
    errors::{CancellationError, LedgerQueryError},
    history_objects::{OrderHistory, WalletHistory},
    ledger_query_api::LedgerQueryApi,
};
pub use reconciliation::SideEffectDispatcher;
