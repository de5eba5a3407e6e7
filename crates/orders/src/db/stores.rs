//! Connected-store persistence.

use chrono::{DateTime, Utc};
use dropkit_core::{Platform, StoreId, UserId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Store;

/// Repository for store rows.
#[derive(Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i64,
    user_id: i64,
    platform: String,
    instance: i32,
    title: String,
    api_url: String,
    currency_format: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let platform = parse_platform(&row.platform)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("platform {}", row.platform)))?;
        Ok(Self {
            id: StoreId::new(row.id),
            user_id: UserId::new(row.user_id),
            platform,
            instance: row.instance,
            title: row.title,
            api_url: row.api_url,
            currency_format: row.currency_format,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_platform(raw: &str) -> Option<Platform> {
    match raw {
        "shopify" => Some(Platform::Shopify),
        "chq" => Some(Platform::CommerceHq),
        "woo" => Some(Platform::WooCommerce),
        "gkart" => Some(Platform::GrooveKart),
        "bigcommerce" => Some(Platform::BigCommerce),
        "fb" => Some(Platform::Facebook),
        "ebay" => Some(Platform::Ebay),
        "google" => Some(Platform::Google),
        _ => None,
    }
}

const STORE_COLUMNS: &str = "id, user_id, platform, instance, title, api_url, \
     currency_format, is_active, created_at, updated_at";

impl StoreRepository {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One store by id.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the store does not exist.
    pub async fn get(&self, id: StoreId) -> Result<Store, RepositoryError> {
        let row: Option<StoreRow> =
            sqlx::query_as(&format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Active stores owned by a user.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_active(&self, user: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE user_id = $1 AND is_active = true ORDER BY id"
        ))
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Store::try_from).collect()
    }

    /// Deactivate a store. The row is kept; products are deleted by the
    /// disconnect flow's background task.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the store does not exist.
    pub async fn deactivate(&self, id: StoreId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE stores SET is_active = false, updated_at = now() WHERE id = $1")
                .bind(id.as_i64())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
