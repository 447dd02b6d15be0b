use log::*;
use thiserror::Error;

use crate::{
    db_types::{
        Money,
        NewTransaction,
        Order,
        Transaction,
        TransactionStatus,
        TransactionType,
        Wallet,
        WalletUpdate,
    },
    reconciliation::balance_calculator::{credit_balance, reverse_amount, BalanceAdjustment, WalletBalances},
    traits::{LedgerStoreError, TransactionStore, WalletStore},
};

#[derive(Debug, Clone, Error)]
pub enum ReversalError {
    #[error("Wallet #{0} does not exist")]
    WalletNotFound(i64),
    #[error("Wallet #{wallet_id} was modified concurrently on each of {attempts} attempts")]
    RetriesExhausted { wallet_id: i64, attempts: usize },
    #[error("Transaction #{0} has already been reversed")]
    AlreadyReversed(i64),
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}

/// The compensating entry that was written, and the wallet as it stands afterwards.
#[derive(Debug, Clone)]
pub struct ReversalResult {
    pub refund: Transaction,
    pub wallet: Wallet,
    /// The wallet did not hold enough to cover the reversal and was floored at zero.
    pub clamped: bool,
}

/// Writes compensating ledger entries.
///
/// Every entry is posted together with its wallet update through [`WalletStore::post_ledger_entry`], so a refund never
/// exists without its balance change. Wallet writes are versioned; when another writer gets there first, the wallet is
/// re-read, the new balances recomputed and the write tried again, up to `retry_limit` attempts in total.
pub struct ReversalEngine<'a, B> {
    db: &'a B,
    retry_limit: usize,
}

impl<'a, B> ReversalEngine<'a, B>
where B: TransactionStore + WalletStore
{
    pub fn new(db: &'a B, retry_limit: usize) -> Self {
        Self { db, retry_limit: retry_limit.max(1) }
    }

    /// Reverses a single earning. The earner's wallet receives a `refund` entry for `-tx.amount` and loses the same
    /// amount from whichever bucket the earning currently sits in.
    ///
    /// An earning is reversed at most once. If a compensating entry already exists, or another writer posts one first,
    /// this returns [`ReversalError::AlreadyReversed`] and leaves the wallet untouched.
    pub async fn reverse_transaction(
        &self,
        tx: &Transaction,
        order: &Order,
        reason: &str,
    ) -> Result<ReversalResult, ReversalError> {
        if let Some(existing) = self.db.fetch_reversal_of(tx.id).await? {
            debug!("↩️ Transaction #{} was already reversed by #{}. Skipping it.", tx.id, existing.id);
            return Err(ReversalError::AlreadyReversed(tx.id));
        }
        let wallet = self.db.fetch_wallet(tx.wallet_id).await?.ok_or(ReversalError::WalletNotFound(tx.wallet_id))?;
        let was_settled = self.current_settlement(tx).await?;
        trace!(
            "↩️ Reversing transaction #{} ({}, {}) for order {} from wallet #{}",
            tx.id,
            tx.amount,
            if was_settled { "settled" } else { "pending" },
            order.id,
            wallet.id
        );
        let refund = NewTransaction::new(wallet.id, -tx.amount, TransactionType::Refund, TransactionStatus::Completed)
            .for_order(order)
            .reversing(tx.id)
            .with_description(format!(
                "Reversal of earning #{} for cancelled order {}: {reason}",
                tx.id, order.order_number
            ));
        let amount = tx.amount;
        let (refund, wallet, clamped) =
            self.post_with_retry(wallet, refund, |current| reverse_amount(current, amount, was_settled)).await?;
        if clamped {
            warn!(
                "↩️ Wallet #{} held less than the {} earned from transaction #{} on order {}. The balances were \
                 clamped at zero.",
                wallet.id, amount, tx.id, order.id
            );
        }
        Ok(ReversalResult { refund, wallet, clamped })
    }

    /// Returns the client's money: a `refund` entry for the full order price, credited to the settled balance.
    pub async fn credit_client(
        &self,
        wallet: Wallet,
        order: &Order,
        reason: &str,
    ) -> Result<ReversalResult, ReversalError> {
        let amount = order.price;
        let refund = NewTransaction::new(wallet.id, amount, TransactionType::Refund, TransactionStatus::Completed)
            .for_order(order)
            .with_description(format!("Refund for cancelled order {}: {reason}", order.order_number));
        let (refund, wallet, _) = self
            .post_with_retry(wallet, refund, |current| BalanceAdjustment {
                balances: credit_balance(current, amount),
                clamped: false,
            })
            .await?;
        debug!("↩️ Credited {amount} to wallet #{} of client {} for order {}", wallet.id, order.client_id, order.id);
        Ok(ReversalResult { refund, wallet, clamped: false })
    }

    /// Records a zero-amount `refund` entry so that an order with nothing to reverse still leaves a trace in the
    /// ledger. No balances change.
    pub async fn record_audit_entry(
        &self,
        wallet: &Wallet,
        order: &Order,
        reason: &str,
    ) -> Result<Transaction, ReversalError> {
        let entry = NewTransaction::new(wallet.id, Money::ZERO, TransactionType::Refund, TransactionStatus::Completed)
            .for_order(order)
            .with_description(format!(
                "Cancellation of order {} with no earnings to reverse: {reason}",
                order.order_number
            ));
        let entry = self.db.insert_transaction(entry).await?;
        debug!("↩️ Audit entry #{} recorded in wallet #{} for order {}", entry.id, wallet.id, order.id);
        Ok(entry)
    }

    /// A settlement job may have completed the earning after it was loaded, so the stored status wins.
    async fn current_settlement(&self, tx: &Transaction) -> Result<bool, ReversalError> {
        match self.db.fetch_transaction_status(tx.id).await? {
            Some(status) => Ok(status.is_settled()),
            None => {
                warn!(
                    "↩️ Transaction #{} disappeared while reversing it. Falling back to its loaded status ({}).",
                    tx.id, tx.status
                );
                Ok(tx.status.is_settled())
            },
        }
    }

    async fn post_with_retry<F>(
        &self,
        mut wallet: Wallet,
        entry: NewTransaction,
        adjust: F,
    ) -> Result<(Transaction, Wallet, bool), ReversalError>
    where
        F: Fn(WalletBalances) -> BalanceAdjustment,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let adjustment = adjust(WalletBalances::from(&wallet));
            let update = WalletUpdate {
                wallet_id: wallet.id,
                expected_version: wallet.version,
                balance: adjustment.balances.balance,
                pending_balance: adjustment.balances.pending_balance,
                total_earnings: adjustment.balances.total_earnings,
            };
            match self.db.post_ledger_entry(entry.clone(), update).await {
                Ok((tx, updated)) => return Ok((tx, updated, adjustment.clamped)),
                Err(e) if e.is_conflict() && attempt < self.retry_limit => {
                    debug!("↩️ Wallet #{} changed underneath us (attempt {attempt}). Re-reading it.", wallet.id);
                    wallet =
                        self.db.fetch_wallet(wallet.id).await?.ok_or(ReversalError::WalletNotFound(wallet.id))?;
                },
                Err(e) if e.is_conflict() => {
                    return Err(ReversalError::RetriesExhausted { wallet_id: wallet.id, attempts: attempt });
                },
                Err(LedgerStoreError::AlreadyReversed(id)) => return Err(ReversalError::AlreadyReversed(id)),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
