//! Product catalog persistence.
//!
//! Mapping state lives in four JSON blob columns (config, variant
//! suppliers, shipping, bundles) kept from the legacy schema; they are
//! parsed into typed [`crate::mapping::ProductMappings`] at load time, with
//! unparseable blobs degrading to empty mappings.

use chrono::{DateTime, Utc};
use dropkit_core::{ProductId, SourceId, StoreId, SupplierId, SupplierType};
use sqlx::PgPool;
use tracing::{info, instrument};

use super::RepositoryError;
use crate::mapping::ProductMappings;
use crate::models::{CatalogProduct, Product, Supplier};

/// Repository for products and their suppliers.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    store_id: i64,
    external_id: Option<String>,
    title: String,
    data: serde_json::Value,
    mapping_config: serde_json::Value,
    variant_suppliers: serde_json::Value,
    shipping_map: serde_json::Value,
    bundle_map: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let mappings = ProductMappings::from_blobs(
            &row.mapping_config,
            &row.variant_suppliers,
            &row.shipping_map,
            &row.bundle_map,
        );
        Self {
            id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            external_id: row.external_id,
            title: row.title,
            data: row.data,
            mappings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: i64,
    product_id: i64,
    store_id: i64,
    source_url: String,
    supplier_name: String,
    supplier_type: String,
    source_id: Option<String>,
    variants_map: serde_json::Value,
    is_default: bool,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: SupplierId::new(row.id),
            product_id: ProductId::new(row.product_id),
            store_id: StoreId::new(row.store_id),
            source_url: row.source_url,
            supplier_name: row.supplier_name,
            supplier_type: SupplierType::from_source(&row.supplier_type),
            source_id: row.source_id.map(SourceId::new),
            variants_map: row.variants_map,
            is_default: row.is_default,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, store_id, external_id, title, data, mapping_config, \
     variant_suppliers, shipping_map, bundle_map, created_at, updated_at";

const SUPPLIER_COLUMNS: &str = "id, product_id, store_id, source_url, supplier_name, \
     supplier_type, source_id, variants_map, is_default";

impl ProductRepository {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load a store's products joined with their suppliers.
    ///
    /// Suppliers are ordered default-first per product, matching what
    /// [`CatalogProduct::default_supplier`] expects.
    ///
    /// # Errors
    ///
    /// Returns error if a query fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn load_catalog(&self, store: StoreId) -> Result<Vec<CatalogProduct>, RepositoryError> {
        let products: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE store_id = $1 ORDER BY id"
        ))
        .bind(store.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let suppliers: Vec<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers \
             WHERE store_id = $1 ORDER BY is_default DESC, id"
        ))
        .bind(store.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: std::collections::HashMap<i64, Vec<Supplier>> =
            std::collections::HashMap::new();
        for supplier in suppliers {
            by_product
                .entry(supplier.product_id)
                .or_default()
                .push(supplier.into());
        }

        Ok(products
            .into_iter()
            .map(|row| {
                let suppliers = by_product.remove(&row.id).unwrap_or_default();
                CatalogProduct {
                    product: row.into(),
                    suppliers,
                }
            })
            .collect())
    }

    /// One product by id, with its suppliers.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<CatalogProduct, RepositoryError> {
        let product: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        let product = product.ok_or(RepositoryError::NotFound)?;

        let suppliers: Vec<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers \
             WHERE product_id = $1 ORDER BY is_default DESC, id"
        ))
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(CatalogProduct {
            product: product.into(),
            suppliers: suppliers.into_iter().map(Supplier::from).collect(),
        })
    }

    /// Delete every product (and supplier) of a store.
    ///
    /// Runs as the background half of the store disconnect flow; the store
    /// row itself is only deactivated, never deleted.
    ///
    /// # Errors
    ///
    /// Returns error if a delete fails.
    #[instrument(skip(self), fields(store_id = %store))]
    pub async fn delete_store_products(&self, store: StoreId) -> Result<u64, RepositoryError> {
        sqlx::query("DELETE FROM suppliers WHERE store_id = $1")
            .bind(store.as_i64())
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM products WHERE store_id = $1")
            .bind(store.as_i64())
            .execute(&self.pool)
            .await?;
        info!(products = result.rows_affected(), "Store products deleted");
        Ok(result.rows_affected())
    }
}
