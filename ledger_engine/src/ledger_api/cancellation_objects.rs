use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{db_types::Order, ledger_api::errors::CancellationError};

pub const DEFAULT_CANCELLATION_REASON: &str = "Cancellation requested by user";
pub const DEFAULT_CANCELLATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WALLET_RETRY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationOptions {
    /// Upper bound on the whole workflow.
    pub timeout: Duration,
    /// Total attempts for a single wallet write before the reversal is given up on.
    pub wallet_retry_limit: usize,
    /// Credit the order price back to the client's wallet, if the client has one.
    pub credit_client_wallet: bool,
}

impl Default for CancellationOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CANCELLATION_TIMEOUT,
            wallet_retry_limit: DEFAULT_WALLET_RETRY_LIMIT,
            credit_client_wallet: true,
        }
    }
}

/// How completely a cancellation was reconciled. Operators use this to spot partial failures in calls that were
/// otherwise successful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationDetails {
    pub transactions_processed: usize,
    pub wallets_updated: usize,
    pub transactions_failed: usize,
    /// Earnings that an earlier or concurrent request had already reversed.
    #[serde(default)]
    pub transactions_skipped: usize,
    pub audit_transaction_created: bool,
    pub cancellation_recorded: bool,
    pub payment_refunded: bool,
    pub client_refunded: bool,
    pub counterparty_notified: bool,
    pub audit_logged: bool,
}

impl CancellationDetails {
    /// True if every reversal and every side effect went through.
    pub fn is_complete(&self) -> bool {
        self.transactions_failed == 0 &&
            self.cancellation_recorded &&
            self.counterparty_notified &&
            self.audit_logged
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// The order was cancelled by this call.
    Cancelled { order: Order, details: CancellationDetails },
    /// The order had already been cancelled. Nothing was changed.
    AlreadyCancelled { order: Order },
    /// The time limit expired after the order had been marked cancelled. Some side effects may not have run.
    CompletedAfterTimeout { order: Order },
}

impl CancellationOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CancellationOutcome::Cancelled { order, .. } => order,
            CancellationOutcome::AlreadyCancelled { order } => order,
            CancellationOutcome::CompletedAfterTimeout { order } => order,
        }
    }

    pub fn details(&self) -> Option<&CancellationDetails> {
        match self {
            CancellationOutcome::Cancelled { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            CancellationOutcome::Cancelled { order, .. } => {
                format!("Order {} has been cancelled", order.order_number)
            },
            CancellationOutcome::AlreadyCancelled { order } => {
                format!("Order {} was already cancelled", order.order_number)
            },
            CancellationOutcome::CompletedAfterTimeout { order } => format!(
                "Order {} has been cancelled, but some follow-up steps may not have completed",
                order.order_number
            ),
        }
    }
}

/// The wire shape of a cancellation result, ready to be returned from an HTTP handler as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<CancellationDetails>,
}

impl From<Result<CancellationOutcome, CancellationError>> for CancellationResponse {
    fn from(result: Result<CancellationOutcome, CancellationError>) -> Self {
        match result {
            Ok(outcome) => Self { success: true, message: outcome.message(), details: outcome.details().cloned() },
            Err(e) => Self { success: false, message: e.to_string(), details: None },
        }
    }
}
