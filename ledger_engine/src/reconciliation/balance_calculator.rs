//! Wallet balance arithmetic for reversals and refunds.
//!
//! Everything here is pure. The reversal engine reads a wallet, calls into this module, and writes the result back
//! with a compare-and-swap, so the same numbers can be recomputed as often as a write conflict demands.
use ledger_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::Wallet;

/// The three monetary fields of a wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalances {
    pub balance: Money,
    pub pending_balance: Money,
    pub total_earnings: Money,
}

impl WalletBalances {
    pub fn new(balance: Money, pending_balance: Money, total_earnings: Money) -> Self {
        Self { balance, pending_balance, total_earnings }
    }

    pub fn is_valid(&self) -> bool {
        !(self.balance.is_negative() || self.pending_balance.is_negative() || self.total_earnings.is_negative())
    }
}

impl From<&Wallet> for WalletBalances {
    fn from(wallet: &Wallet) -> Self {
        Self::new(wallet.balance, wallet.pending_balance, wallet.total_earnings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub balances: WalletBalances,
    /// `true` if at least one field would have gone negative and was floored at zero instead. This means the wallet
    /// no longer held everything the reversed transaction had credited to it.
    pub clamped: bool,
}

/// Reverses an earning of `amount` from a wallet.
///
/// The sign of `amount` is ignored. If the original earning had settled, `balance` is debited, otherwise
/// `pending_balance` is. Exactly one of the two is touched. `total_earnings` is always debited by the same amount.
/// Every field is floored at zero.
pub fn reverse_amount(current: WalletBalances, amount: Money, was_settled: bool) -> BalanceAdjustment {
    let amount = amount.abs();
    let (total_earnings, earnings_clamped) = current.total_earnings.sub_floor_zero(amount);
    let (balances, bucket_clamped) = if was_settled {
        let (balance, clamped) = current.balance.sub_floor_zero(amount);
        (WalletBalances { balance, total_earnings, ..current }, clamped)
    } else {
        let (pending_balance, clamped) = current.pending_balance.sub_floor_zero(amount);
        (WalletBalances { pending_balance, total_earnings, ..current }, clamped)
    };
    BalanceAdjustment { balances, clamped: earnings_clamped || bucket_clamped }
}

/// Credits `amount` to the settled balance. Used for client-side refunds, which are not earnings, so
/// `total_earnings` is left alone. The sign of `amount` is ignored and the addition saturates.
pub fn credit_balance(current: WalletBalances, amount: Money) -> WalletBalances {
    WalletBalances { balance: current.balance.saturating_add(amount.abs()), ..current }
}
