//! # Ledger engine public API
//!
//! * [`cancellation_api`] cancels orders and reconciles the ledger: earnings are reversed, the client is refunded,
//!   the counterparty is notified and the whole thing is audited.
//! * [`ledger_query_api`] gives read-only access to orders, wallets and their histories.
//!
//! The other submodules hold the data objects and errors the APIs return.
//!
//! # API usage
//!
//! An API instance is created by supplying a backend that implements the traits the API needs. The SQLite backend
//! implements all of them, including the notification channel and audit sink:
//!
//! ```rust,ignore
//! use ledger_engine::{CancellationApi, SideEffectDispatcher, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone());
//! let api = CancellationApi::new(db, dispatcher, EventProducers::default(), CancellationOptions::default());
//! let outcome = api.cancel_order(&order_id, "client-7", Some("no longer needed")).await?;
//! ```

pub mod cancellation_api;
pub mod cancellation_objects;
pub mod errors;
pub mod history_objects;
pub mod ledger_query_api;
