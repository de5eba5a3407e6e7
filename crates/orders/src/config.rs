//! Pipeline configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DROPKIT_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `DROPKIT_AFFILIATE_KEY` - Affiliate key for tagged supplier redirect URLs
//! - `DROPKIT_ORDERS_PER_PAGE` - Default orders page size (default: 20)
//! - `DROPKIT_PLACEMENT_TTL_SECS` - Placement record cache TTL (default: 86400)
//! - `DROPKIT_SYNC_FLAG_TTL_SECS` - Sync-in-progress lease TTL (default: 43200)
//! - `DROPKIT_ORDER_LOCK_TTL_SECS` - Per-order ledger lock lease (default: 15)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    /// `PostgreSQL` database connection URL (contains password).
    pub database_url: SecretString,
    /// Affiliate key appended to supplier redirect URLs, when configured.
    pub affiliate_key: Option<String>,
    /// Default page size for order listings.
    pub orders_per_page: u32,
    /// TTL for cached placement records.
    pub placement_ttl: Duration,
    /// Lease for the per-store sync-in-progress flag. A crashed sync task
    /// becomes schedulable again once this expires.
    pub sync_flag_ttl: Duration,
    /// Lease for the per-(store, order) ledger lock.
    pub order_lock_ttl: Duration,
}

impl OrdersConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `.env` via `dotenvy` first so local development works without
    /// exporting anything.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = required("DROPKIT_DATABASE_URL")?;

        Ok(Self {
            database_url: SecretString::from(database_url),
            affiliate_key: std::env::var("DROPKIT_AFFILIATE_KEY").ok(),
            orders_per_page: optional_parsed("DROPKIT_ORDERS_PER_PAGE", 20)?,
            placement_ttl: Duration::from_secs(optional_parsed(
                "DROPKIT_PLACEMENT_TTL_SECS",
                86_400,
            )?),
            sync_flag_ttl: Duration::from_secs(optional_parsed(
                "DROPKIT_SYNC_FLAG_TTL_SECS",
                43_200,
            )?),
            order_lock_ttl: Duration::from_secs(optional_parsed(
                "DROPKIT_ORDER_LOCK_TTL_SECS",
                15,
            )?),
        })
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            database_url: SecretString::from(String::new()),
            affiliate_key: None,
            orders_per_page: 20,
            placement_ttl: Duration::from_secs(86_400),
            sync_flag_ttl: Duration::from_secs(43_200),
            order_lock_ttl: Duration::from_secs(15),
        }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidEnvVar(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
