use cucumber::World;
use ledger_engine::{
    db_types::{Order, Wallet},
    traits::{LedgerDatabase, LedgerQueries, WalletStore},
    CancellationOptions,
    CancellationResponse,
    SqliteDatabase,
};
use log::*;

use crate::support::{prepare_env::prepare_test_env, sqlite_api, SqliteCancellationApi};

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
    pub responses: Vec<CancellationResponse>,
}

#[derive(Debug)]
pub struct LedgerSystem {
    pub db: SqliteDatabase,
    pub api: SqliteCancellationApi,
}

impl LedgerWorld {
    pub fn system(&self) -> &LedgerSystem {
        self.system.as_ref().expect("Ledger not initialised. Start the scenario with 'Given a fresh ledger'")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn api(&self) -> &SqliteCancellationApi {
        &self.system().api
    }

    pub fn last_response(&self) -> &CancellationResponse {
        self.responses.last().expect("No cancellation has been requested yet")
    }

    pub async fn order(&self, order_number: &str) -> Order {
        self.db()
            .fetch_order_by_number(order_number)
            .await
            .expect("Error fetching order")
            .unwrap_or_else(|| panic!("Order {order_number} does not exist"))
    }

    pub async fn wallet(&self, user_id: &str) -> Wallet {
        self.db()
            .fetch_wallet_for_user(user_id)
            .await
            .expect("Error fetching wallet")
            .unwrap_or_else(|| panic!("{user_id} has no wallet"))
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let db = prepare_test_env().await;
        debug!("Created ledger at {}", db.url());
        let api = sqlite_api(&db, CancellationOptions::default());
        Self { db, api }
    }
}
