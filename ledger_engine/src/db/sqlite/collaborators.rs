//! Storage-backed implementations of the notification channel and audit sink. Notifications are written to an inbox
//! table that the web application reads from; audit events go to an append-only table.
use log::trace;
use sqlx::SqliteConnection;

use super::no_row_returned;
use crate::{
    db_types::{AuditEvent, NewAuditEvent, NewNotification, Notification, OrderId},
    traits::LedgerStoreError,
};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, LedgerStoreError> {
    let payload = notification.payload.to_string();
    let record = sqlx::query_as::<_, Notification>(
        r#"
            INSERT INTO notifications (user_id, notification_type, title, message, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, notification_type, title, message, payload, created_at;
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.notification_type)
    .bind(notification.title)
    .bind(notification.message)
    .bind(payload)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("notifications"))?;
    trace!("📨️ Notification #{} queued for {}", record.id, record.user_id);
    Ok(record)
}

pub async fn fetch_notifications_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, LedgerStoreError> {
    let records = sqlx::query_as::<_, Notification>(
        r#"
            SELECT id, user_id, notification_type, title, message, payload, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY id ASC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(records)
}

pub async fn insert_audit_event(event: NewAuditEvent, conn: &mut SqliteConnection) -> Result<AuditEvent, LedgerStoreError> {
    let details = event.details.to_string();
    let record = sqlx::query_as::<_, AuditEvent>(
        r#"
            INSERT INTO audit_events (event_type, severity, user_id, order_id, amount, reason, initiator_role, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, event_type, severity, user_id, order_id, amount, reason, initiator_role, details, created_at;
        "#,
    )
    .bind(event.event_type)
    .bind(event.severity)
    .bind(event.user_id)
    .bind(event.order_id)
    .bind(event.amount)
    .bind(event.reason)
    .bind(event.initiator_role)
    .bind(details)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| no_row_returned("audit_events"))?;
    trace!("🛡️ Audit event #{} recorded", record.id);
    Ok(record)
}

pub async fn fetch_audit_events_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEvent>, LedgerStoreError> {
    let records = sqlx::query_as::<_, AuditEvent>(
        r#"
            SELECT id, event_type, severity, user_id, order_id, amount, reason, initiator_role, details, created_at
            FROM audit_events
            WHERE order_id = $1
            ORDER BY id ASC;
        "#,
    )
    .bind(*order_id)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
