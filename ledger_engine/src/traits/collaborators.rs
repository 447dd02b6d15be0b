use thiserror::Error;

use crate::db_types::{NewAuditEvent, NewNotification};

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("The notification could not be delivered to {user_id}. {reason}")]
    NotificationFailed { user_id: String, reason: String },
    #[error("The audit event could not be recorded. {0}")]
    AuditFailed(String),
}

/// Delivers informational messages to users. Delivery is best-effort: callers log failures and carry on.
#[allow(async_fn_in_trait)]
pub trait NotificationChannel {
    async fn send_notification(&self, notification: NewNotification) -> Result<(), DispatchError>;
}

/// Records structured security events.
#[allow(async_fn_in_trait)]
pub trait AuditSink {
    async fn record_audit_event(&self, event: NewAuditEvent) -> Result<(), DispatchError>;
}
