//! Domain entities for the reconciliation pipeline.
//!
//! These are the locally persisted records: connected stores, tracked
//! products, their supplier relationships, the order-track ledger rows, and
//! pending product-change diffs from the price monitor. Platform-shaped JSON
//! blobs (variant maps, bundle maps) are parsed into the typed structures in
//! [`crate::mapping`] at load time.

use chrono::{DateTime, Utc};
use dropkit_core::{
    FulfillmentStatus, LineId, OrderId, Platform, ProductChangeId, ProductId, SourceId,
    SourceStatus, StoreId, SupplierId, SupplierType, TrackId, UserId, VariantId,
};
use serde::{Deserialize, Serialize};

use crate::mapping::ProductMappings;

// =============================================================================
// Store
// =============================================================================

/// One connected sales-channel instance.
///
/// Disconnecting a store deactivates it (`is_active = false`) rather than
/// deleting the row; product deletion happens in a background task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Local primary key.
    pub id: StoreId,
    /// Owning user.
    pub user_id: UserId,
    /// Sales-channel platform.
    pub platform: Platform,
    /// Channel slot index, for platforms supporting multiple instances
    /// (Facebook/eBay/Google via SureDone). Always 1 otherwise.
    pub instance: i32,
    /// Display title.
    pub title: String,
    /// Base API URL for the platform instance.
    pub api_url: String,
    /// Currency format template (e.g., "${{amount}}").
    pub currency_format: Option<String>,
    /// False once the user disconnects the store.
    pub is_active: bool,
    /// When the store was connected.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product & Supplier
// =============================================================================

/// One locally tracked catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Local primary key.
    pub id: ProductId,
    /// Owning store.
    pub store_id: StoreId,
    /// Platform-side id/GUID/SKU once connected; `None` for a
    /// saved-for-later draft that has not been pushed to any store.
    pub external_id: Option<String>,
    /// Product title.
    pub title: String,
    /// Raw platform product JSON as last synced.
    pub data: serde_json::Value,
    /// Typed mapping state parsed from the stored blobs.
    pub mappings: ProductMappings,
    /// When the product was saved.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product is connected to a platform listing.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.external_id.is_some()
    }
}

/// One external sourcing relationship bound to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    /// Local primary key.
    pub id: SupplierId,
    /// Product this supplier sources.
    pub product_id: ProductId,
    /// Owning store (denormalized for per-store queries).
    pub store_id: StoreId,
    /// Source product URL (AliExpress/eBay listing).
    pub source_url: String,
    /// Display name of the supplier.
    pub supplier_name: String,
    /// Sourcing platform, derived from the URL at save time.
    pub supplier_type: SupplierType,
    /// Supplier-side product id extracted from the URL, when parseable.
    pub source_id: Option<SourceId>,
    /// Supplier-side variant mapping blob.
    pub variants_map: serde_json::Value,
    /// Exactly one supplier per product may be the default.
    pub is_default: bool,
}

/// A product joined with its suppliers, as the pipeline consumes it.
#[derive(Debug, Clone)]
pub struct CatalogProduct {
    /// The product record.
    pub product: Product,
    /// All suppliers for the product, default first when present.
    pub suppliers: Vec<Supplier>,
}

impl CatalogProduct {
    /// The default supplier, if any supplier exists.
    ///
    /// A connected product with suppliers always has exactly one default;
    /// falling back to the first supplier covers rows predating that
    /// invariant.
    #[must_use]
    pub fn default_supplier(&self) -> Option<&Supplier> {
        self.suppliers
            .iter()
            .find(|s| s.is_default)
            .or_else(|| self.suppliers.first())
    }

    /// Look up a supplier by id.
    #[must_use]
    pub fn supplier(&self, id: SupplierId) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| s.id == id)
    }
}

/// The set of locally known products for one store, keyed for line matching.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: std::collections::HashMap<String, CatalogProduct>,
}

impl Catalog {
    /// Build a catalog from connected products.
    ///
    /// Unconnected drafts carry no external id and are skipped - order lines
    /// can never reference them.
    #[must_use]
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        let products = products
            .into_iter()
            .filter_map(|p| p.product.external_id.clone().map(|ext| (ext, p)))
            .collect();
        Self { products }
    }

    /// Find the connected product for a platform product id.
    #[must_use]
    pub fn get(&self, external_id: &str) -> Option<&CatalogProduct> {
        self.products.get(external_id)
    }

    /// Find a product by its local id (bundle children reference these).
    #[must_use]
    pub fn get_by_product_id(&self, id: ProductId) -> Option<&CatalogProduct> {
        self.products.values().find(|p| p.product.id == id)
    }

    /// Number of connected products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

// =============================================================================
// OrderTrack
// =============================================================================

/// One ledger row: the supplier order placed for a store order line.
///
/// Unique per (store, order, line); duplicate rows are a repaired race, see
/// the ledger's collapse step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTrack {
    /// Local primary key.
    pub id: TrackId,
    /// Owning store.
    pub store_id: StoreId,
    /// Platform order id.
    pub order_id: OrderId,
    /// Platform order line id.
    pub line_id: LineId,
    /// Supplier order id, once one was placed.
    pub source_id: Option<SourceId>,
    /// Sourcing platform the order was placed on.
    pub source_type: SupplierType,
    /// Supplier-reported order status, passed through verbatim.
    pub source_status: SourceStatus,
    /// Store-side fulfillment status as last reconciled against shipments.
    pub store_status: FulfillmentStatus,
    /// Carrier tracking number once shipped.
    pub tracking_number: Option<String>,
    /// Hidden from the orders view by the user.
    pub hidden: bool,
    /// Seen by the user (clears the "new" badge).
    pub seen: bool,
    /// Raw supplier order detail JSON.
    pub data: serde_json::Value,
    /// When the track was created.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When `source_status` last changed.
    pub status_updated_at: DateTime<Utc>,
}

impl OrderTrack {
    /// Fields for inserting a fresh track.
    #[must_use]
    pub fn key(&self) -> (StoreId, &OrderId, &LineId) {
        (self.store_id, &self.order_id, &self.line_id)
    }
}

/// Insertable track fields; timestamps and id are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTrack {
    /// Owning store.
    pub store_id: StoreId,
    /// Platform order id.
    pub order_id: OrderId,
    /// Platform order line id.
    pub line_id: LineId,
    /// Supplier order id.
    pub source_id: Option<SourceId>,
    /// Sourcing platform.
    pub source_type: SupplierType,
}

// =============================================================================
// ProductChange
// =============================================================================

/// Kind of change detected by the external price monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Price,
    Quantity,
    Availability,
    VariantAdded,
    VariantRemoved,
}

/// A pending diff for one product, consumed then marked seen/hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductChange {
    /// Local primary key.
    pub id: ProductChangeId,
    /// Affected product (any platform).
    pub product_id: ProductId,
    /// What changed.
    pub kind: ChangeKind,
    /// Monitor-reported change payload (old/new values, variant ids).
    pub payload: serde_json::Value,
    /// User has viewed the change.
    pub seen: bool,
    /// User dismissed the change.
    pub hidden: bool,
    /// When the monitor reported it.
    pub created_at: DateTime<Utc>,
    /// When the change was applied to the store listing, if it was.
    pub applied_at: Option<DateTime<Utc>>,
}

/// A bundle constituent resolved for an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleLine {
    /// Child product.
    pub product_id: ProductId,
    /// Child variant.
    pub variant_id: VariantId,
    /// Child SKU for display/fulfillment matching.
    pub sku: String,
    /// `child_quantity * parent_line_quantity`.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ProductMappings;
    use chrono::Utc;

    fn product(id: i64, external: Option<&str>) -> CatalogProduct {
        CatalogProduct {
            product: Product {
                id: ProductId::new(id),
                store_id: StoreId::new(1),
                external_id: external.map(String::from),
                title: format!("Product {id}"),
                data: serde_json::Value::Null,
                mappings: ProductMappings::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            suppliers: vec![],
        }
    }

    #[test]
    fn test_catalog_skips_unconnected_drafts() {
        let catalog = Catalog::new(vec![product(1, Some("ext-1")), product(2, None)]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("ext-1").is_some());
    }

    #[test]
    fn test_default_supplier_falls_back_to_first() {
        let mut p = product(1, Some("ext-1"));
        p.suppliers.push(Supplier {
            id: SupplierId::new(10),
            product_id: ProductId::new(1),
            store_id: StoreId::new(1),
            source_url: "https://www.aliexpress.com/item/1.html".into(),
            supplier_name: "Vendor".into(),
            supplier_type: SupplierType::Aliexpress,
            source_id: Some(SourceId::new("1")),
            variants_map: serde_json::Value::Null,
            is_default: false,
        });
        assert_eq!(p.default_supplier().map(|s| s.id), Some(SupplierId::new(10)));
    }
}
