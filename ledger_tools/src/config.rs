use std::{env, time::Duration};

use ledger_common::{parse_boolean_flag, DEFAULT_CURRENCY_CODE};
use ledger_engine::{
    ledger_api::cancellation_objects::{DEFAULT_CANCELLATION_TIMEOUT, DEFAULT_WALLET_RETRY_LIMIT},
    CancellationOptions,
};
use log::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct ReconciliationConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound on a single cancellation, from the first read to the last side effect.
    pub cancel_timeout: Duration,
    /// How many times a wallet write is attempted when another writer keeps getting there first.
    pub wallet_retry_limit: usize,
    /// When false, cancelling an order does not refund the order price to the client's wallet.
    pub credit_client_wallet: bool,
    /// The currency wallet amounts are reported in. Wallets do not carry a currency of their own.
    pub default_currency: String,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            cancel_timeout: DEFAULT_CANCELLATION_TIMEOUT,
            wallet_retry_limit: DEFAULT_WALLET_RETRY_LIMIT,
            credit_client_wallet: true,
            default_currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

impl ReconciliationConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let database_url = env::var("LEDGER_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ LEDGER_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            defaults.database_url.clone()
        });
        let max_connections = parse_env("LEDGER_DB_MAX_CONNECTIONS", defaults.max_connections);
        let cancel_timeout = env::var("LEDGER_CANCEL_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for LEDGER_CANCEL_TIMEOUT_MS. {e}"))
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.cancel_timeout);
        let wallet_retry_limit = match parse_env("LEDGER_WALLET_RETRY_LIMIT", defaults.wallet_retry_limit) {
            0 => {
                warn!("🪛️ LEDGER_WALLET_RETRY_LIMIT must be at least 1. Using 1.");
                1
            },
            n => n,
        };
        let credit_client_wallet =
            parse_boolean_flag(env::var("LEDGER_CREDIT_CLIENT_WALLET").ok(), defaults.credit_client_wallet);
        let default_currency = env::var("LEDGER_DEFAULT_CURRENCY")
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_currency);
        Self { database_url, max_connections, cancel_timeout, wallet_retry_limit, credit_client_wallet, default_currency }
    }

    pub fn options(&self) -> CancellationOptions {
        CancellationOptions {
            timeout: self.cancel_timeout,
            wallet_retry_limit: self.wallet_retry_limit,
            credit_client_wallet: self.credit_client_wallet,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}
