use log::*;

use crate::{
    db_types::{NewAuditEvent, NewNotification},
    traits::{AuditSink, NotificationChannel},
};

/// Best-effort delivery of notifications and audit events.
///
/// Neither method returns an error. A failure is logged at warning level and reported as `false`.
pub struct SideEffectDispatcher<N, A> {
    notifier: N,
    audit: A,
}

impl<N, A> SideEffectDispatcher<N, A>
where
    N: NotificationChannel,
    A: AuditSink,
{
    pub fn new(notifier: N, audit: A) -> Self {
        Self { notifier, audit }
    }

    pub async fn notify(&self, notification: NewNotification) -> bool {
        let user_id = notification.user_id.clone();
        match self.notifier.send_notification(notification).await {
            Ok(()) => {
                debug!("📣️ Notification delivered to {user_id}");
                true
            },
            Err(e) => {
                warn!("📣️ Could not notify {user_id}. {e}");
                false
            },
        }
    }

    pub async fn audit(&self, event: NewAuditEvent) -> bool {
        let order_id = event.order_id.map(|id| id.to_string()).unwrap_or_else(|| "(none)".to_string());
        match self.audit.record_audit_event(event).await {
            Ok(()) => {
                debug!("📣️ Audit event recorded for order {order_id}");
                true
            },
            Err(e) => {
                warn!("📣️ Could not record audit event for order {order_id}. {e}");
                false
            },
        }
    }
}
