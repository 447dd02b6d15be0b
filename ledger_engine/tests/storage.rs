use ledger_engine::{
    db_types::{Money, NewOrder, NewTransaction, NewWallet, TransactionStatus, TransactionType, WalletUpdate},
    traits::{LedgerQueries, LedgerStoreError, OrderStore, TransactionStore, WalletStore},
};

use crate::support::{
    prepare_env::{prepare_test_env, tear_down},
    seed_o1,
    wallet_of,
    CLIENT,
    FREELANCER,
};

mod support;

#[tokio::test]
async fn inserted_rows_are_visible_from_the_whole_pool() {
    let db = prepare_test_env().await;
    for i in 0..50 {
        let user_id = format!("user-{i}");
        let wallet = db.insert_wallet(NewWallet::new(&user_id)).await.expect("Error inserting wallet");
        let fetched = db.fetch_wallet_for_user(&user_id).await.expect("Error fetching wallet");
        assert_eq!(fetched.map(|w| w.id), Some(wallet.id), "Wallet for {user_id} not visible after insert");

        let order = db
            .insert_order(NewOrder::new(&format!("R{i}"), CLIENT, &user_id, Money::from(100)))
            .await
            .expect("Error inserting order");
        let fetched = db.fetch_order(&order.id).await.expect("Error fetching order");
        assert_eq!(fetched.map(|o| o.version), Some(order.version), "Order R{i} not visible after insert");
    }
    tear_down(db).await;
}

#[tokio::test]
async fn updated_rows_are_visible_from_the_whole_pool() {
    let db = prepare_test_env().await;
    let mut wallet = db.insert_wallet(NewWallet::new(FREELANCER)).await.expect("Error inserting wallet");
    for i in 1..=50 {
        let update = WalletUpdate {
            wallet_id: wallet.id,
            expected_version: wallet.version,
            balance: Money::from(i),
            pending_balance: Money::ZERO,
            total_earnings: Money::from(i),
        };
        wallet = db.update_wallet(update).await.expect("Error updating wallet");
        let fetched = wallet_of(&db, FREELANCER).await;
        assert_eq!(fetched.version, wallet.version);
        assert_eq!(fetched.balance, Money::from(i));
    }
    tear_down(db).await;
}

#[tokio::test]
async fn an_earning_can_only_be_reversed_once() {
    let db = prepare_test_env().await;
    let fixture = seed_o1(&db).await;
    let earning = db
        .fetch_transactions_for_order(&fixture.order.id, TransactionType::Earning)
        .await
        .expect("Error fetching earnings")
        .pop()
        .expect("No earning");
    assert!(db.fetch_reversal_of(earning.id).await.unwrap().is_none());

    let reversal = || {
        NewTransaction::new(earning.wallet_id, -earning.amount, TransactionType::Refund, TransactionStatus::Completed)
            .for_order(&fixture.order)
            .reversing(earning.id)
    };
    let first = db.insert_transaction(reversal()).await.expect("Error inserting reversal");
    assert_eq!(first.reverses_tx_id, Some(earning.id));

    let err = db.insert_transaction(reversal()).await.expect_err("Second reversal was accepted");
    assert!(matches!(err, LedgerStoreError::AlreadyReversed(id) if id == earning.id), "Unexpected error: {err}");
    let found = db.fetch_reversal_of(earning.id).await.unwrap().expect("Reversal not found");
    assert_eq!(found.id, first.id);
    tear_down(db).await;
}

#[tokio::test]
async fn rejected_reversal_leaves_the_wallet_alone() {
    let db = prepare_test_env().await;
    let fixture = seed_o1(&db).await;
    let earning = db
        .fetch_transactions_for_order(&fixture.order.id, TransactionType::Earning)
        .await
        .unwrap()
        .pop()
        .expect("No earning");
    let reversal =
        NewTransaction::new(earning.wallet_id, -earning.amount, TransactionType::Refund, TransactionStatus::Completed)
            .for_order(&fixture.order)
            .reversing(earning.id);
    db.insert_transaction(reversal.clone()).await.expect("Error inserting reversal");

    let wallet = wallet_of(&db, FREELANCER).await;
    let update = WalletUpdate {
        wallet_id: wallet.id,
        expected_version: wallet.version,
        balance: Money::ZERO,
        pending_balance: Money::ZERO,
        total_earnings: Money::ZERO,
    };
    let err = db.post_ledger_entry(reversal, update).await.expect_err("Duplicate reversal was posted");
    assert!(matches!(err, LedgerStoreError::AlreadyReversed(_)), "Unexpected error: {err}");

    let after = wallet_of(&db, FREELANCER).await;
    assert_eq!(after.version, wallet.version);
    assert_eq!(after.balance, Money::from(9_000));
    let refunds = db
        .fetch_wallet_transactions(wallet.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.tx_type == TransactionType::Refund)
        .count();
    assert_eq!(refunds, 1);
    tear_down(db).await;
}
