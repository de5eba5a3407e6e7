//! Pending product-change persistence.
//!
//! Rows come from the price monitor (via the bulk supplier sync); the user
//! reviews them and they are marked seen, dismissed, or recorded as applied.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{ProductChangeId, ProductId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::feed::{NewProductChange, ProductChangeSink};
use crate::models::{ChangeKind, ProductChange};

/// Postgres-backed store for pending product changes.
#[derive(Clone)]
pub struct PgProductChangeStore {
    pool: PgPool,
}

impl PgProductChangeStore {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChangeRow {
    id: i64,
    product_id: i64,
    kind: String,
    payload: serde_json::Value,
    seen: bool,
    hidden: bool,
    created_at: DateTime<Utc>,
    applied_at: Option<DateTime<Utc>>,
}

impl TryFrom<ChangeRow> for ProductChange {
    type Error = RepositoryError;

    fn try_from(row: ChangeRow) -> Result<Self, Self::Error> {
        let kind = parse_kind(&row.kind)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("change kind {}", row.kind)))?;
        Ok(Self {
            id: ProductChangeId::new(row.id),
            product_id: ProductId::new(row.product_id),
            kind,
            payload: row.payload,
            seen: row.seen,
            hidden: row.hidden,
            created_at: row.created_at,
            applied_at: row.applied_at,
        })
    }
}

const fn kind_str(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Price => "price",
        ChangeKind::Quantity => "quantity",
        ChangeKind::Availability => "availability",
        ChangeKind::VariantAdded => "variant_added",
        ChangeKind::VariantRemoved => "variant_removed",
    }
}

fn parse_kind(raw: &str) -> Option<ChangeKind> {
    match raw {
        "price" => Some(ChangeKind::Price),
        "quantity" => Some(ChangeKind::Quantity),
        "availability" => Some(ChangeKind::Availability),
        "variant_added" => Some(ChangeKind::VariantAdded),
        "variant_removed" => Some(ChangeKind::VariantRemoved),
        _ => None,
    }
}

const CHANGE_COLUMNS: &str =
    "id, product_id, kind, payload, seen, hidden, created_at, applied_at";

impl PgProductChangeStore {
    /// Pending (not hidden) changes for one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or a row carries an unknown kind.
    pub async fn list_pending(
        &self,
        product: ProductId,
    ) -> Result<Vec<ProductChange>, RepositoryError> {
        let rows: Vec<ChangeRow> = sqlx::query_as(&format!(
            "SELECT {CHANGE_COLUMNS} FROM product_changes \
             WHERE product_id = $1 AND hidden = false \
             ORDER BY created_at DESC"
        ))
        .bind(product.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductChange::try_from).collect()
    }

    /// Mark a change as seen by the user.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the change does not exist.
    pub async fn mark_seen(&self, id: ProductChangeId) -> Result<(), RepositoryError> {
        self.set_flag(id, "seen", true).await
    }

    /// Dismiss a change from the review list.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the change does not exist.
    pub async fn hide(&self, id: ProductChangeId) -> Result<(), RepositoryError> {
        self.set_flag(id, "hidden", true).await
    }

    /// Record that the change was applied to the store listing.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the change does not exist.
    pub async fn mark_applied(&self, id: ProductChangeId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE product_changes SET applied_at = now(), seen = true WHERE id = $1")
                .bind(id.as_i64())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_flag(
        &self,
        id: ProductChangeId,
        column: &str,
        value: bool,
    ) -> Result<(), RepositoryError> {
        // `column` is a compile-time constant from the callers above.
        let result = sqlx::query(&format!(
            "UPDATE product_changes SET {column} = $2 WHERE id = $1"
        ))
        .bind(id.as_i64())
        .bind(value)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProductChangeSink for PgProductChangeStore {
    async fn record(&self, change: NewProductChange) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_changes (product_id, kind, payload) VALUES ($1, $2, $3)",
        )
        .bind(change.product_id.as_i64())
        .bind(kind_str(change.kind))
        .bind(&change.payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
