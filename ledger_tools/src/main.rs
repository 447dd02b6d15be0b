use anyhow::{anyhow, Result};
use clap::Parser;
use dotenvy::dotenv;
use ledger_engine::{
    events::EventProducers,
    CancellationApi,
    LedgerQueryApi,
    SideEffectDispatcher,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    cli::{display_envs, Arguments, Command},
    config::ReconciliationConfig,
};

mod cli;
mod config;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let config = ReconciliationConfig::from_env_or_default();
    if let Err(e) = run(cli.command, config).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: ReconciliationConfig) -> Result<()> {
    match command {
        Command::Envs => {
            display_envs();
            Ok(())
        },
        Command::Migrate => migrate(&config).await,
        Command::Cancel { order, initiator, reason } => cancel_order(&config, &order, &initiator, reason.as_deref()).await,
        Command::Wallet { user } => print_wallet(&config, &user).await,
        Command::Order { order } => print_order(&config, &order).await,
        Command::Notifications { user } => print_notifications(&config, &user).await,
    }
}

async fn connect(config: &ReconciliationConfig) -> Result<SqliteDatabase> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections).await?;
    Ok(db)
}

async fn migrate(config: &ReconciliationConfig) -> Result<()> {
    let url = config.database_url.as_str();
    if !Sqlite::database_exists(url).await? {
        info!("🗃️ Creating database {url}");
        Sqlite::create_database(url).await?;
    }
    let db = connect(config).await?;
    db.run_migrations().await?;
    println!("Database {url} is up to date");
    Ok(())
}

async fn cancel_order(
    config: &ReconciliationConfig,
    order_number: &str,
    initiator: &str,
    reason: Option<&str>,
) -> Result<()> {
    let db = connect(config).await?;
    let order = LedgerQueryApi::new(db.clone())
        .order_by_number(order_number)
        .await?
        .ok_or_else(|| anyhow!("Order {order_number} does not exist"))?;
    let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone());
    let api = CancellationApi::new(db, dispatcher, EventProducers::default(), config.options());
    let response = api.cancel_order_response(&order.id, initiator, reason).await;
    info!("🧾️ Cancellation of order {order_number} by {initiator}: {}", response.message);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn print_wallet(config: &ReconciliationConfig, user: &str) -> Result<()> {
    let api = LedgerQueryApi::new(connect(config).await?);
    let history = api.wallet_history(user).await?;
    let currency = config.default_currency.as_str();
    let wallet = &history.wallet;
    println!("Wallet #{} for {}", wallet.id, wallet.user_id);
    println!("  Balance:         {} {currency}", wallet.balance);
    println!("  Pending balance: {} {currency}", wallet.pending_balance);
    println!("  Total earnings:  {} {currency}", wallet.total_earnings);
    println!("{}", serde_json::to_string_pretty(&history.transactions)?);
    Ok(())
}

async fn print_order(config: &ReconciliationConfig, order_number: &str) -> Result<()> {
    let api = LedgerQueryApi::new(connect(config).await?);
    let order =
        api.order_by_number(order_number).await?.ok_or_else(|| anyhow!("Order {order_number} does not exist"))?;
    let history = api.order_history(&order.id).await?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    println!("Net ledger amount: {} {}", history.net_amount(), history.order.currency);
    Ok(())
}

async fn print_notifications(config: &ReconciliationConfig, user: &str) -> Result<()> {
    let api = LedgerQueryApi::new(connect(config).await?);
    let notifications = api.notifications_for_user(user).await?;
    println!("{}", serde_json::to_string_pretty(&notifications)?);
    Ok(())
}
