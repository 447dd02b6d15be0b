//! # Ledger reconciliation
//!
//! The building blocks the cancellation workflow is assembled from:
//!
//! * [`balance_calculator`] does the wallet arithmetic. It is pure and never lets a field go negative.
//! * [`reversal_engine`] writes compensating ledger entries together with their wallet updates.
//! * [`dispatcher`] delivers notifications and audit events without ever failing the caller.
pub mod balance_calculator;
pub mod dispatcher;
pub mod reversal_engine;

pub use balance_calculator::{credit_balance, reverse_amount, BalanceAdjustment, WalletBalances};
pub use dispatcher::SideEffectDispatcher;
pub use reversal_engine::{ReversalEngine, ReversalError, ReversalResult};
