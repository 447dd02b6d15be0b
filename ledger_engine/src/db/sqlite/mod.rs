pub mod cancellations;
pub mod collaborators;
pub mod orders;
pub mod payments;
pub mod transactions;
pub mod wallets;

mod sqlite_impl;

use std::env;

use log::info;
pub use sqlite_impl::SqliteDatabase;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::traits::LedgerStoreError;

const SQLITE_DB_URL: &str = "sqlite://data/ledger.db";

pub fn db_url() -> String {
    let result = env::var("LEDGER_DATABASE_URL").unwrap_or_else(|_| {
        info!("LEDGER_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

// Writes with a `RETURNING` clause are always drained with `fetch_all`. A statement that is not stepped to completion
// keeps its changes invisible to the other connections in the pool.
fn no_row_returned(table: &str) -> LedgerStoreError {
    LedgerStoreError::DatabaseError(format!("Write to {table} did not return the new row"))
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, LedgerStoreError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
