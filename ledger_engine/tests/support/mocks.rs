use ledger_engine::{
    db_types::{NewAuditEvent, NewNotification},
    traits::{AuditSink, DispatchError, NotificationChannel},
};
use mockall::mock;

mock! {
    pub Notifier {}
    impl NotificationChannel for Notifier {
        async fn send_notification(&self, notification: NewNotification) -> Result<(), DispatchError>;
    }
}

mock! {
    pub Auditor {}
    impl AuditSink for Auditor {
        async fn record_audit_event(&self, event: NewAuditEvent) -> Result<(), DispatchError>;
    }
}
