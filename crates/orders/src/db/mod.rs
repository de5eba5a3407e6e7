//! `PostgreSQL` persistence for the reconciliation pipeline.
//!
//! ## Tables
//!
//! - `stores` - Connected sales channels
//! - `products` / `suppliers` - Tracked catalog and sourcing relationships
//! - `order_tracks` - The order-track ledger
//! - `order_items` - Cached per-track supplier order item rows
//! - `orders_mirror` - Local relational mirror of platform orders
//! - `product_changes` - Pending price-monitor diffs
//!
//! Queries use runtime-checked `query_as` so the crate builds without a live
//! database; repository structs implement the seam traits consumed by the
//! pipeline ([`crate::tracks::TrackStore`], [`crate::sync::OrderMirror`]).

pub mod orders_mirror;
pub mod product_changes;
pub mod products;
pub mod stores;
pub mod suppliers;
pub mod tracks;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders_mirror::PgOrderMirror;
pub use product_changes::PgProductChangeStore;
pub use products::ProductRepository;
pub use stores::StoreRepository;
pub use suppliers::SupplierRepository;
pub use tracks::PgTrackStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate track for a line).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
