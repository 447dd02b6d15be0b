use std::{collections::BTreeSet, fmt::Debug};

use log::*;
use serde_json::json;

use crate::{
    db_types::{
        AuditEventType,
        AuditSeverity,
        NewAuditEvent,
        NewCancellationRecord,
        NewNotification,
        NotificationType,
        Order,
        OrderId,
        OrderStatusType,
        PartyRole,
        TransactionType,
    },
    events::{EventProducers, OrderCancelledEvent},
    ledger_api::{
        cancellation_objects::{
            CancellationDetails,
            CancellationOptions,
            CancellationOutcome,
            CancellationResponse,
            DEFAULT_CANCELLATION_REASON,
        },
        errors::CancellationError,
    },
    reconciliation::{ReversalEngine, ReversalError, SideEffectDispatcher},
    traits::{AuditSink, LedgerDatabase, LedgerStoreError, NotificationChannel},
};

/// `CancellationApi` cancels in-flight orders and unwinds the money that moved when they were placed.
///
/// The order's transition to `cancelled` is the single commit point. Everything before it (earning reversals) and
/// everything after it (cancellation record, payment refund, client credit, notification, audit) is best-effort: a
/// failure is logged with enough context to reconcile by hand and the workflow carries on.
///
/// Before touching any money the order is claimed with a compare-and-swap on its version, so two concurrent
/// cancellations of the same order cannot both reverse its earnings. The loser gets
/// [`CancellationError::Conflict`] and changes nothing.
pub struct CancellationApi<B, N, A> {
    db: B,
    dispatcher: SideEffectDispatcher<N, A>,
    producers: EventProducers,
    options: CancellationOptions,
}

impl<B, N, A> Debug for CancellationApi<B, N, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CancellationApi ({:?})", self.options)
    }
}

impl<B, N, A> CancellationApi<B, N, A> {
    pub fn new(
        db: B,
        dispatcher: SideEffectDispatcher<N, A>,
        producers: EventProducers,
        options: CancellationOptions,
    ) -> Self {
        Self { db, dispatcher, producers, options }
    }

    pub fn options(&self) -> &CancellationOptions {
        &self.options
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B, N, A> CancellationApi<B, N, A>
where
    B: LedgerDatabase,
    N: NotificationChannel,
    A: AuditSink,
{
    /// Cancels the order on behalf of `initiator_id`, who must be the order's client or freelancer.
    ///
    /// Cancelling an order that is already cancelled succeeds without changing anything. A blank or missing reason
    /// is replaced with [`DEFAULT_CANCELLATION_REASON`].
    ///
    /// The whole workflow is bounded by [`CancellationOptions::timeout`]. If the limit is hit, the order is re-read:
    /// if it made it to `cancelled` the call still succeeds, otherwise [`CancellationError::Timeout`] is returned.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        initiator_id: &str,
        reason: Option<&str>,
    ) -> Result<CancellationOutcome, CancellationError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(DEFAULT_CANCELLATION_REASON);
        info!("🚫️ {initiator_id} requested cancellation of order {order_id}. Reason: {reason}");
        match tokio::time::timeout(self.options.timeout, self.run_cancellation(order_id, initiator_id, reason)).await {
            Ok(result) => result,
            Err(_) => self.resolve_timeout(order_id).await,
        }
    }

    /// Same as [`Self::cancel_order`], but flattens the result into a serializable [`CancellationResponse`].
    pub async fn cancel_order_response(
        &self,
        order_id: &OrderId,
        initiator_id: &str,
        reason: Option<&str>,
    ) -> CancellationResponse {
        self.cancel_order(order_id, initiator_id, reason).await.into()
    }

    async fn run_cancellation(
        &self,
        order_id: &OrderId,
        initiator_id: &str,
        reason: &str,
    ) -> Result<CancellationOutcome, CancellationError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(CancellationError::NotFound(*order_id))?;
        let role = order.role_of(initiator_id).ok_or_else(|| {
            warn!("🚫️ {initiator_id} tried to cancel order {order_id}, but is neither its client nor its freelancer");
            CancellationError::Unauthorized { order_id: *order_id, user_id: initiator_id.to_string() }
        })?;
        if order.status == OrderStatusType::Cancelled {
            info!("🚫️ Order {order_id} is already cancelled. Nothing to do.");
            return Ok(CancellationOutcome::AlreadyCancelled { order });
        }
        if !order.status.is_cancellable() {
            info!("🚫️ Order {order_id} is {} and cannot be cancelled", order.status);
            return Err(CancellationError::InvalidState { order_id: *order_id, status: order.status });
        }
        let claimed_version = self.db.claim_order(order_id, order.version).await.map_err(|e| match e {
            LedgerStoreError::VersionConflict { .. } => {
                info!("🚫️ Order {order_id} was modified while it was being cancelled. Rejecting this request.");
                CancellationError::Conflict(*order_id)
            },
            e => e.into(),
        })?;
        trace!("🚫️ Order {order_id} claimed at version {claimed_version}");

        let mut details = CancellationDetails::default();
        self.reverse_earnings(&order, reason, &mut details).await?;

        // The commit point. Reversals are not undone if it fails; a retry skips them.
        let cancelled = match self.db.update_order_status(order_id, OrderStatusType::Cancelled, claimed_version).await {
            Ok(order) => order,
            Err(LedgerStoreError::VersionConflict { .. }) => return self.resolve_lost_commit(order_id, &details).await,
            Err(e) => {
                error!(
                    "🚫️ Could not mark order {order_id} as cancelled after reversing {} earnings. Retrying the \
                     cancellation will skip them. {e}",
                    details.transactions_processed
                );
                return Err(CancellationError::PersistenceFailure(e.to_string()));
            },
        };
        info!("🚫️ Order {order_id} is now cancelled");

        details.cancellation_recorded = self.record_cancellation(&cancelled, initiator_id, reason).await;
        details.payment_refunded = self.refund_payment(&cancelled).await;
        details.client_refunded = self.refund_client(&cancelled, reason).await;
        details.counterparty_notified = self.notify_counterparty(&cancelled, role, reason).await;
        details.audit_logged = self.log_audit_event(&cancelled, initiator_id, role, reason, &details).await;

        if !details.is_complete() {
            warn!("🚫️ Order {order_id} was cancelled, but reconciliation was incomplete: {details:?}");
        }
        self.call_order_cancelled_hook(&cancelled, initiator_id, reason, &details).await;
        Ok(CancellationOutcome::Cancelled { order: cancelled, details })
    }

    /// Reverses every earning on the order, or leaves a zero-amount audit entry if there are none. Failed reversals
    /// are counted and skipped. Only failing to load the earnings at all is an error.
    async fn reverse_earnings(
        &self,
        order: &Order,
        reason: &str,
        details: &mut CancellationDetails,
    ) -> Result<(), CancellationError> {
        let earnings = self.db.fetch_transactions_for_order(&order.id, TransactionType::Earning).await.map_err(|e| {
            error!("🚫️ Could not load the earnings for order {}. {e}", order.id);
            CancellationError::PersistenceFailure(e.to_string())
        })?;
        let engine = ReversalEngine::new(&self.db, self.options.wallet_retry_limit);
        if earnings.is_empty() {
            details.audit_transaction_created = self.record_audit_entry(&engine, order, reason).await;
            return Ok(());
        }
        debug!("🚫️ Reversing {} earnings for order {}", earnings.len(), order.id);
        let mut wallets = BTreeSet::new();
        for tx in &earnings {
            match engine.reverse_transaction(tx, order, reason).await {
                Ok(result) => {
                    details.transactions_processed += 1;
                    wallets.insert(result.wallet.id);
                },
                Err(ReversalError::AlreadyReversed(id)) => {
                    details.transactions_skipped += 1;
                    info!("🚫️ Transaction #{id} on order {} was reversed by an earlier attempt. Skipping it.", order.id);
                },
                Err(e) => {
                    details.transactions_failed += 1;
                    error!(
                        "🚫️ Could not reverse transaction #{} (wallet #{}) for order {}. It must be reconciled \
                         manually. {e}",
                        tx.id, tx.wallet_id, order.id
                    );
                },
            }
        }
        details.wallets_updated = wallets.len();
        Ok(())
    }

    /// Another request moved the order on between our claim and the commit point. Every earning it could have
    /// reversed is reversed at most once, so the only question left is who finished the job.
    async fn resolve_lost_commit(
        &self,
        order_id: &OrderId,
        details: &CancellationDetails,
    ) -> Result<CancellationOutcome, CancellationError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) if order.status == OrderStatusType::Cancelled => {
                info!(
                    "🚫️ Order {order_id} was cancelled by a concurrent request. This request reversed {} earnings and \
                     skipped {}.",
                    details.transactions_processed, details.transactions_skipped
                );
                Ok(CancellationOutcome::AlreadyCancelled { order })
            },
            _ => {
                error!(
                    "🚫️ Order {order_id} was modified before it could be marked cancelled, after reversing {} \
                     earnings. Retrying the cancellation will skip them.",
                    details.transactions_processed
                );
                Err(CancellationError::Conflict(*order_id))
            },
        }
    }

    async fn record_audit_entry(&self, engine: &ReversalEngine<'_, B>, order: &Order, reason: &str) -> bool {
        let wallet = match self.db.fetch_wallet_for_user(&order.freelancer_id).await {
            Ok(Some(w)) => w,
            Ok(None) => {
                info!(
                    "🚫️ Order {} has no earnings and freelancer {} has no wallet. No audit entry recorded.",
                    order.id, order.freelancer_id
                );
                return false;
            },
            Err(e) => {
                warn!("🚫️ Could not fetch the wallet of freelancer {} for order {}. {e}", order.freelancer_id, order.id);
                return false;
            },
        };
        match engine.record_audit_entry(&wallet, order, reason).await {
            Ok(_) => true,
            Err(e) => {
                warn!("🚫️ Could not record the audit entry for order {} in wallet #{}. {e}", order.id, wallet.id);
                false
            },
        }
    }

    async fn record_cancellation(&self, order: &Order, initiator_id: &str, reason: &str) -> bool {
        let record = NewCancellationRecord {
            order_id: order.id,
            reason: reason.to_string(),
            cancelled_by: initiator_id.to_string(),
        };
        match self.db.insert_cancellation(record).await {
            Ok(_) => true,
            Err(e) => {
                warn!("🚫️ Could not save the cancellation record for order {}. {e}", order.id);
                false
            },
        }
    }

    async fn refund_payment(&self, order: &Order) -> bool {
        match self.db.mark_payment_refunded(&order.id).await {
            Ok(payment) => {
                debug!("🚫️ Payment #{} for order {} marked as refunded", payment.id, order.id);
                true
            },
            Err(LedgerStoreError::PaymentNotFound(_)) => {
                debug!("🚫️ Order {} has no payment record to refund", order.id);
                false
            },
            Err(e) => {
                warn!("🚫️ Could not mark the payment for order {} as refunded. {e}", order.id);
                false
            },
        }
    }

    async fn refund_client(&self, order: &Order, reason: &str) -> bool {
        if !self.options.credit_client_wallet {
            trace!("🚫️ Client wallet credits are disabled. Skipping the client refund for order {}", order.id);
            return false;
        }
        let wallet = match self.db.fetch_wallet_for_user(&order.client_id).await {
            Ok(Some(w)) => w,
            Ok(None) => {
                debug!("🚫️ Client {} has no wallet. Skipping the client refund for order {}", order.client_id, order.id);
                return false;
            },
            Err(e) => {
                warn!("🚫️ Could not fetch the wallet of client {} for order {}. {e}", order.client_id, order.id);
                return false;
            },
        };
        let wallet_id = wallet.id;
        let engine = ReversalEngine::new(&self.db, self.options.wallet_retry_limit);
        match engine.credit_client(wallet, order, reason).await {
            Ok(_) => true,
            Err(e) => {
                warn!("🚫️ Could not refund {} to wallet #{wallet_id} for order {}. {e}", order.price, order.id);
                false
            },
        }
    }

    async fn notify_counterparty(&self, order: &Order, initiator_role: PartyRole, reason: &str) -> bool {
        let recipient = order.counterparty_of(initiator_role);
        let notification = NewNotification {
            user_id: recipient.to_string(),
            notification_type: NotificationType::OrderCancelled,
            title: "Order cancelled".to_string(),
            message: format!("Order {} was cancelled by the {initiator_role}. Reason: {reason}", order.order_number),
            payload: json!({
                "orderId": order.id,
                "orderNumber": order.order_number,
                "cancelledBy": initiator_role,
                "reason": reason,
                "amount": order.price,
                "currency": order.currency,
            }),
        };
        self.dispatcher.notify(notification).await
    }

    async fn log_audit_event(
        &self,
        order: &Order,
        initiator_id: &str,
        initiator_role: PartyRole,
        reason: &str,
        details: &CancellationDetails,
    ) -> bool {
        let severity = if details.transactions_failed > 0 { AuditSeverity::Warning } else { AuditSeverity::Info };
        let event = NewAuditEvent {
            event_type: AuditEventType::PaymentRefunded,
            severity,
            user_id: initiator_id.to_string(),
            order_id: Some(order.id),
            amount: order.price,
            reason: reason.to_string(),
            initiator_role,
            details: json!({
                "orderNumber": order.order_number,
                "clientId": order.client_id,
                "freelancerId": order.freelancer_id,
                "transactionsProcessed": details.transactions_processed,
                "transactionsFailed": details.transactions_failed,
                "transactionsSkipped": details.transactions_skipped,
                "walletsUpdated": details.wallets_updated,
                "clientRefunded": details.client_refunded,
            }),
        };
        self.dispatcher.audit(event).await
    }

    async fn call_order_cancelled_hook(
        &self,
        order: &Order,
        initiator_id: &str,
        reason: &str,
        details: &CancellationDetails,
    ) {
        for emitter in &self.producers.order_cancelled_producer {
            debug!("🚫️ Notifying order cancelled hook subscribers");
            let event = OrderCancelledEvent::new(order.clone(), initiator_id, reason, details.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn resolve_timeout(&self, order_id: &OrderId) -> Result<CancellationOutcome, CancellationError> {
        warn!("🚫️ Cancelling order {order_id} took longer than {:?}. Checking how far it got.", self.options.timeout);
        match self.db.fetch_order(order_id).await {
            Ok(Some(order)) if order.status == OrderStatusType::Cancelled => {
                warn!("🚫️ Order {order_id} was cancelled, but follow-up steps may not have run");
                Ok(CancellationOutcome::CompletedAfterTimeout { order })
            },
            Ok(_) => Err(CancellationError::Timeout { order_id: *order_id, after: self.options.timeout }),
            Err(e) => {
                error!("🚫️ Could not re-read order {order_id} after the time limit expired. {e}");
                Err(CancellationError::Timeout { order_id: *order_id, after: self.options.timeout })
            },
        }
    }
}
