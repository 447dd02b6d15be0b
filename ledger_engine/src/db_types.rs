use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use ledger_common::Money;
use ledger_common::DEFAULT_CURRENCY_CODE;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse::<i64>().map(Self).map_err(|_| ConversionError::new("order id", s))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed, but the freelancer has not started work.
    Pending,
    /// The freelancer is working on the order.
    InProgress,
    /// The work has been delivered and is awaiting acceptance.
    Delivered,
    /// The client accepted the delivery.
    Completed,
    /// The order was cancelled by one of the parties. This is a terminal state.
    Cancelled,
}

impl OrderStatusType {
    /// Only orders that are still pending or in progress can be cancelled by one of the parties.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatusType::Pending | OrderStatusType::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::InProgress => "in_progress",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Completed => "completed",
            OrderStatusType::Cancelled => "cancelled",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable order number, e.g. `ORD-2024-0042`
    pub order_number: String,
    pub client_id: String,
    pub freelancer_id: String,
    pub service_id: String,
    pub status: OrderStatusType,
    pub price: Money,
    pub currency: String,
    /// Optimistic concurrency token. Every write to the order row increments it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the role `user_id` plays in this order, if any.
    pub fn role_of(&self, user_id: &str) -> Option<PartyRole> {
        if self.client_id == user_id {
            Some(PartyRole::Client)
        } else if self.freelancer_id == user_id {
            Some(PartyRole::Freelancer)
        } else {
            None
        }
    }

    /// The party on the other side of the order from `role`.
    pub fn counterparty_of(&self, role: PartyRole) -> &str {
        match role {
            PartyRole::Client => &self.freelancer_id,
            PartyRole::Freelancer => &self.client_id,
        }
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub client_id: String,
    pub freelancer_id: String,
    pub service_id: String,
    pub status: OrderStatusType,
    pub price: Money,
    pub currency: String,
}

impl NewOrder {
    pub fn new(order_number: &str, client_id: &str, freelancer_id: &str, price: Money) -> Self {
        Self {
            order_number: order_number.to_string(),
            client_id: client_id.to_string(),
            freelancer_id: freelancer_id.to_string(),
            service_id: format!("svc-{order_number}"),
            status: OrderStatusType::Pending,
            price,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = status;
        self
    }

    pub fn with_service_id(mut self, service_id: &str) -> Self {
        self.service_id = service_id.to_string();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }
}

//--------------------------------------       PartyRole       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Client,
    Freelancer,
}

impl Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyRole::Client => write!(f, "client"),
            PartyRole::Freelancer => write!(f, "freelancer"),
        }
    }
}

//--------------------------------------        Wallet         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    /// Settled, withdrawable funds
    pub balance: Money,
    /// Funds that have been earned but not yet released
    pub pending_balance: Money,
    /// Lifetime earnings accumulator
    pub total_earnings: Money,
    /// Optimistic concurrency token. Every write to the wallet row increments it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewWallet {
    pub user_id: String,
    pub balance: Money,
    pub pending_balance: Money,
    pub total_earnings: Money,
}

impl NewWallet {
    pub fn new(user_id: &str) -> Self {
        Self { user_id: user_id.to_string(), ..Default::default() }
    }

    pub fn with_balance(mut self, balance: Money) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_pending_balance(mut self, pending: Money) -> Self {
        self.pending_balance = pending;
        self
    }

    pub fn with_total_earnings(mut self, earnings: Money) -> Self {
        self.total_earnings = earnings;
        self
    }
}

/// A compare-and-swap write of a wallet's monetary fields. The write only succeeds if the stored version still equals
/// `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletUpdate {
    pub wallet_id: i64,
    pub expected_version: i64,
    pub balance: Money,
    pub pending_balance: Money,
    pub total_earnings: Money,
}

//--------------------------------------   TransactionType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Earning,
    Refund,
    Withdrawal,
    Deposit,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Earning => write!(f, "earning"),
            TransactionType::Refund => write!(f, "refund"),
            TransactionType::Withdrawal => write!(f, "withdrawal"),
            TransactionType::Deposit => write!(f, "deposit"),
        }
    }
}

//--------------------------------------  TransactionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// The funds are settled and count towards the wallet's `balance`.
    Completed,
    /// The funds are still held in the wallet's `pending_balance`.
    Pending,
}

impl TransactionStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, TransactionStatus::Completed)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Pending => write!(f, "pending"),
        }
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
/// A ledger entry. Entries are never modified once their effect on the wallet has been applied; a reversal is recorded
/// as a new, compensating entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub wallet_id: i64,
    /// Positive amounts credit the wallet owner, negative amounts debit them.
    pub amount: Money,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub order_id: Option<OrderId>,
    pub client_id: Option<String>,
    pub freelancer_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    /// For compensating entries, the transaction this one reverses.
    pub reverses_tx_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub wallet_id: i64,
    pub amount: Money,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub order_id: Option<OrderId>,
    pub client_id: Option<String>,
    pub freelancer_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    pub reverses_tx_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(wallet_id: i64, amount: Money, tx_type: TransactionType, status: TransactionStatus) -> Self {
        let completed_at = status.is_settled().then(Utc::now);
        Self {
            wallet_id,
            amount,
            tx_type,
            status,
            order_id: None,
            client_id: None,
            freelancer_id: None,
            service_id: None,
            description: String::default(),
            reverses_tx_id: None,
            completed_at,
        }
    }

    /// Copies the order linkage fields (order, client, freelancer and service ids) from `order`.
    pub fn for_order(mut self, order: &Order) -> Self {
        self.order_id = Some(order.id);
        self.client_id = Some(order.client_id.clone());
        self.freelancer_id = Some(order.freelancer_id.clone());
        self.service_id = Some(order.service_id.clone());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Marks this entry as the compensating entry for `tx_id`. The store accepts only one per transaction.
    pub fn reversing(mut self, tx_id: i64) -> Self {
        self.reverses_tx_id = Some(tx_id);
        self
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Money,
}

impl NewPayment {
    pub fn new(order_id: OrderId, amount: Money) -> Self {
        Self { order_id, amount }
    }
}

//--------------------------------------  CancellationRecord   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub reason: String,
    pub cancelled_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCancellationRecord {
    pub order_id: OrderId,
    pub reason: String,
    pub cancelled_by: String,
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// Raw JSON payload
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
}

//--------------------------------------      AuditEvent       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    PaymentRefunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub user_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub reason: String,
    pub initiator_role: PartyRole,
    /// Raw JSON details
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub user_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub reason: String,
    pub initiator_role: PartyRole,
    pub details: serde_json::Value,
}
