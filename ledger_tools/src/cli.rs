use std::{env, env::VarError};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Operator tool for the marketplace ledger")]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cancel an order and reconcile the ledger. Prints the cancellation response as JSON.
    Cancel {
        /// The order number, e.g. "O1"
        #[arg(short = 'o', long = "order")]
        order: String,
        /// The user requesting the cancellation. Must be the order's client or freelancer.
        #[arg(short = 'i', long = "initiator")]
        initiator: String,
        #[arg(short = 'r', long = "reason")]
        reason: Option<String>,
    },
    /// Print a user's wallet and its ledger
    Wallet {
        #[arg(short = 'u', long = "user")]
        user: String,
    },
    /// Print an order with its transactions, payment and cancellation records
    Order {
        #[arg(short = 'o', long = "order")]
        order: String,
    },
    /// Print the notifications sent to a user
    Notifications {
        #[arg(short = 'u', long = "user")]
        user: String,
    },
    /// Create the database if necessary and bring its schema up to date
    Migrate,
    /// Print the configuration environment variables
    Envs,
}

pub fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 7] = [
        "RUST_LOG",
        "LEDGER_DATABASE_URL",
        "LEDGER_DB_MAX_CONNECTIONS",
        "LEDGER_CANCEL_TIMEOUT_MS",
        "LEDGER_WALLET_RETRY_LIMIT",
        "LEDGER_CREDIT_CLIENT_WALLET",
        "LEDGER_DEFAULT_CURRENCY",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
