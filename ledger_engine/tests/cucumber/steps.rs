use std::str::FromStr;

use cucumber::{given, then, when};
use ledger_engine::{
    db_types::{
        Money,
        NewOrder,
        NewPayment,
        NewWallet,
        OrderStatusType,
        PaymentStatus,
        TransactionStatus,
        TransactionType,
        WalletUpdate,
    },
    traits::{LedgerQueries, WalletStore},
};

use crate::cucumber::LedgerWorld;

#[given(expr = "a(n) {word} order {word} for {int} between client {word} and freelancer {word}")]
async fn order_exists(
    world: &mut LedgerWorld,
    status: String,
    order_number: String,
    price: i64,
    client: String,
    freelancer: String,
) {
    let status = OrderStatusType::from_str(&status).expect("Not a valid order status");
    let order = NewOrder::new(&order_number, &client, &freelancer, Money::from(price)).with_status(status);
    world.db().insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "{word} has a wallet with balance {int}")]
async fn wallet_with_balance(world: &mut LedgerWorld, user_id: String, balance: i64) {
    set_wallet(world, &user_id, balance, 0).await;
}

#[given(expr = "{word} has a wallet with balance {int} and pending balance {int}")]
async fn wallet_with_pending(world: &mut LedgerWorld, user_id: String, balance: i64, pending: i64) {
    set_wallet(world, &user_id, balance, pending).await;
}

async fn set_wallet(world: &mut LedgerWorld, user_id: &str, balance: i64, pending: i64) {
    let db = world.db();
    match db.fetch_wallet_for_user(user_id).await.expect("Error fetching wallet") {
        Some(wallet) => {
            let update = WalletUpdate {
                wallet_id: wallet.id,
                expected_version: wallet.version,
                balance: Money::from(balance),
                pending_balance: Money::from(pending),
                total_earnings: wallet.total_earnings,
            };
            db.update_wallet(update).await.expect("Error updating wallet");
        },
        None => {
            let wallet =
                NewWallet::new(user_id).with_balance(Money::from(balance)).with_pending_balance(Money::from(pending));
            db.insert_wallet(wallet).await.expect("Error inserting wallet");
        },
    }
}

#[given(expr = "a {word} earning of {int} on order {word}")]
async fn earning_on_order(world: &mut LedgerWorld, status: String, amount: i64, order_number: String) {
    let status = match status.as_str() {
        "completed" | "settled" => TransactionStatus::Completed,
        "pending" => TransactionStatus::Pending,
        s => panic!("Unknown earning status {s}"),
    };
    let order = world.order(&order_number).await;
    world.db().record_earning(&order, Money::from(amount), status).await.expect("Error recording earning");
}

#[given(expr = "a payment for order {word}")]
async fn payment_for_order(world: &mut LedgerWorld, order_number: String) {
    let order = world.order(&order_number).await;
    world.db().insert_payment(NewPayment::new(order.id, order.price)).await.expect("Error inserting payment");
}

#[given(expr = "{word} withdraws everything but {int}")]
async fn withdraw(world: &mut LedgerWorld, user_id: String, remaining: i64) {
    let wallet = world.wallet(&user_id).await;
    let update = WalletUpdate {
        wallet_id: wallet.id,
        expected_version: wallet.version,
        balance: Money::from(remaining),
        pending_balance: wallet.pending_balance,
        total_earnings: wallet.total_earnings,
    };
    world.db().update_wallet(update).await.expect("Error updating wallet");
}

#[when(expr = "{word} cancels order {word} because {string}")]
async fn cancel_with_reason(world: &mut LedgerWorld, user_id: String, order_number: String, reason: String) {
    let order = world.order(&order_number).await;
    let response = world.api().cancel_order_response(&order.id, &user_id, Some(&reason)).await;
    world.responses.push(response);
}

#[when(expr = "{word} cancels order {word}")]
async fn cancel(world: &mut LedgerWorld, user_id: String, order_number: String) {
    let order = world.order(&order_number).await;
    let response = world.api().cancel_order_response(&order.id, &user_id, None).await;
    world.responses.push(response);
}

#[then("the cancellation succeeds")]
async fn cancellation_succeeds(world: &mut LedgerWorld) {
    let response = world.last_response();
    assert!(response.success, "Cancellation failed: {}", response.message);
}

#[then(expr = "the cancellation fails with {string}")]
async fn cancellation_fails(world: &mut LedgerWorld, message: String) {
    let response = world.last_response();
    assert!(!response.success, "Cancellation unexpectedly succeeded");
    assert!(response.message.contains(&message), "'{}' does not contain '{message}'", response.message);
}

#[then(expr = "the response message contains {string}")]
async fn message_contains(world: &mut LedgerWorld, message: String) {
    let response = world.last_response();
    assert!(response.message.contains(&message), "'{}' does not contain '{message}'", response.message);
}

#[then(expr = "{int} earning(s) was/were reversed")]
async fn earnings_reversed(world: &mut LedgerWorld, count: usize) {
    let details = world.last_response().details.as_ref().expect("The response has no details");
    assert_eq!(details.transactions_processed, count);
}

#[then(expr = "order {word} is {word}")]
async fn order_status(world: &mut LedgerWorld, order_number: String, status: String) {
    let order = world.order(&order_number).await;
    assert_eq!(order.status.to_string(), status);
}

#[then(expr = "{word} has a balance of {int}")]
async fn check_balance(world: &mut LedgerWorld, user_id: String, balance: i64) {
    assert_eq!(world.wallet(&user_id).await.balance, Money::from(balance));
}

#[then(expr = "{word} has a pending balance of {int}")]
async fn check_pending(world: &mut LedgerWorld, user_id: String, pending: i64) {
    assert_eq!(world.wallet(&user_id).await.pending_balance, Money::from(pending));
}

#[then(expr = "{word} has total earnings of {int}")]
async fn check_earnings(world: &mut LedgerWorld, user_id: String, earnings: i64) {
    assert_eq!(world.wallet(&user_id).await.total_earnings, Money::from(earnings));
}

#[then(expr = "order {word} has {int} refund transaction(s)")]
async fn refund_count(world: &mut LedgerWorld, order_number: String, count: usize) {
    let order = world.order(&order_number).await;
    let txs = world.db().fetch_order_transactions(&order.id).await.expect("Error fetching transactions");
    let refunds = txs.iter().filter(|t| t.tx_type == TransactionType::Refund).count();
    assert_eq!(refunds, count);
}

#[then(expr = "{word} has a refund of {int} for order {word}")]
async fn refund_for_user(world: &mut LedgerWorld, user_id: String, amount: i64, order_number: String) {
    let wallet = world.wallet(&user_id).await;
    let order = world.order(&order_number).await;
    let txs = world.db().fetch_wallet_transactions(wallet.id).await.expect("Error fetching transactions");
    let found = txs.iter().any(|t| {
        t.tx_type == TransactionType::Refund && t.order_id == Some(order.id) && t.amount == Money::from(amount)
    });
    assert!(found, "No refund of {amount} for order {order_number} in {user_id}'s wallet");
}

#[then(expr = "the payment for order {word} is refunded")]
async fn payment_refunded(world: &mut LedgerWorld, order_number: String) {
    let order = world.order(&order_number).await;
    let payment = world.db().fetch_payment_for_order(&order.id).await.expect("Error fetching payment");
    assert_eq!(payment.map(|p| p.status), Some(PaymentStatus::Refunded));
}

#[then(expr = "{word} received {int} notification(s)")]
async fn notifications(world: &mut LedgerWorld, user_id: String, count: usize) {
    let notifications = world.db().fetch_notifications_for_user(&user_id).await.expect("Error fetching notifications");
    assert_eq!(notifications.len(), count);
}

#[then(expr = "order {word} has {int} cancellation record(s)")]
async fn cancellation_records(world: &mut LedgerWorld, order_number: String, count: usize) {
    let order = world.order(&order_number).await;
    let records = world.db().fetch_cancellations_for_order(&order.id).await.expect("Error fetching records");
    assert_eq!(records.len(), count);
}
