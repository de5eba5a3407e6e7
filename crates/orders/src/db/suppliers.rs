//! Supplier persistence.
//!
//! Maintains the single-default invariant: exactly one supplier per product
//! carries `is_default` once any supplier exists, and deleting the default
//! promotes another remaining supplier.

use dropkit_core::{ProductId, SupplierId};
use sqlx::PgPool;
use tracing::{info, instrument};

use super::RepositoryError;

/// Repository for supplier rows.
#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Make one supplier the product's default, clearing the others.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the supplier does not belong to
    /// the product.
    pub async fn set_default(
        &self,
        product: ProductId,
        supplier: SupplierId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE suppliers SET is_default = false WHERE product_id = $1")
            .bind(product.as_i64())
            .execute(&mut *tx)
            .await?;
        let result =
            sqlx::query("UPDATE suppliers SET is_default = true WHERE id = $1 AND product_id = $2")
                .bind(supplier.as_i64())
                .bind(product.as_i64())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a supplier, promoting another to default when the deleted one
    /// held it.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the supplier does not exist.
    #[instrument(skip(self), fields(supplier_id = %supplier))]
    pub async fn delete(&self, supplier: SupplierId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, bool)> =
            sqlx::query_as("SELECT product_id, is_default FROM suppliers WHERE id = $1")
                .bind(supplier.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let (product_id, was_default) = row.ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier.as_i64())
            .execute(&mut *tx)
            .await?;

        if was_default {
            let promoted = sqlx::query(
                "UPDATE suppliers SET is_default = true WHERE id = \
                 (SELECT id FROM suppliers WHERE product_id = $1 ORDER BY id LIMIT 1)",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
            if promoted.rows_affected() > 0 {
                info!(product_id, "Default supplier reassigned");
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
