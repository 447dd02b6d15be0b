#![allow(dead_code)]

pub mod faulty_db;
pub mod mocks;
pub mod prepare_env;

use ledger_engine::{
    db_types::{Money, NewOrder, NewPayment, NewWallet, Order, OrderStatusType, TransactionStatus, Wallet},
    events::EventProducers,
    traits::{AuditSink, NotificationChannel, WalletStore},
    CancellationApi,
    CancellationOptions,
    SideEffectDispatcher,
    SqliteDatabase,
};

pub const CLIENT: &str = "client-alice";
pub const FREELANCER: &str = "freelancer-bob";
pub const STRANGER: &str = "mallory";

pub type SqliteCancellationApi = CancellationApi<SqliteDatabase, SqliteDatabase, SqliteDatabase>;

/// A cancellation API where the database also acts as notification channel and audit sink.
pub fn sqlite_api(db: &SqliteDatabase, options: CancellationOptions) -> SqliteCancellationApi {
    let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone());
    CancellationApi::new(db.clone(), dispatcher, EventProducers::default(), options)
}

pub fn api_with<B, N, A>(db: B, notifier: N, auditor: A, options: CancellationOptions) -> CancellationApi<B, N, A>
where
    N: NotificationChannel,
    A: AuditSink,
{
    CancellationApi::new(db, SideEffectDispatcher::new(notifier, auditor), EventProducers::default(), options)
}

/// Scenario O1: an in-progress order for 100.00, one settled earning of 90.00 in the freelancer's wallet and a
/// client wallet holding 5.00.
pub struct OrderFixture {
    pub order: Order,
    pub freelancer_wallet: Wallet,
    pub client_wallet: Option<Wallet>,
}

pub async fn seed_o1(db: &SqliteDatabase) -> OrderFixture {
    let order = db
        .insert_order(
            NewOrder::new("O1", CLIENT, FREELANCER, Money::from(10_000)).with_status(OrderStatusType::InProgress),
        )
        .await
        .expect("Error inserting order");
    db.insert_wallet(NewWallet::new(FREELANCER)).await.expect("Error inserting wallet");
    let client_wallet = db
        .insert_wallet(NewWallet::new(CLIENT).with_balance(Money::from(500)))
        .await
        .expect("Error inserting wallet");
    db.insert_payment(NewPayment::new(order.id, order.price)).await.expect("Error inserting payment");
    let (_, freelancer_wallet) = db
        .record_earning(&order, Money::from(9_000), TransactionStatus::Completed)
        .await
        .expect("Error recording earning");
    OrderFixture { order, freelancer_wallet, client_wallet: Some(client_wallet) }
}

/// An order with the given status and no ledger history. Only the freelancer has a wallet.
pub async fn seed_bare_order(db: &SqliteDatabase, number: &str, status: OrderStatusType) -> OrderFixture {
    let order = db
        .insert_order(NewOrder::new(number, CLIENT, FREELANCER, Money::from(2_500)).with_status(status))
        .await
        .expect("Error inserting order");
    let freelancer_wallet = match db.fetch_wallet_for_user(FREELANCER).await.expect("Error fetching wallet") {
        Some(w) => w,
        None => db.insert_wallet(NewWallet::new(FREELANCER)).await.expect("Error inserting wallet"),
    };
    OrderFixture { order, freelancer_wallet, client_wallet: None }
}

pub async fn wallet_of<B: WalletStore>(db: &B, user_id: &str) -> Wallet {
    db.fetch_wallet_for_user(user_id).await.expect("Error fetching wallet").expect("Wallet does not exist")
}
