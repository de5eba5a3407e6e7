//! Bulk supplier price/stock sync.
//!
//! A background-only path: for every supplier in a store's catalog, fetch
//! the current variant list from the supplier feed, diff it against the
//! stored variant map, and record one pending [`ProductChange`] per
//! difference for the user to review. Never touched by the reconciliation
//! request path.

use std::sync::Arc;

use async_trait::async_trait;
use dropkit_core::{ProductId, SourceId, StoreId, SupplierType, UserId, parse_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::cache::OrderCache;
use crate::db::RepositoryError;
use crate::error::{OrderFlowError, UpstreamApiError};
use crate::models::{CatalogProduct, ChangeKind};
use crate::permissions::{PermissionOracle, Resource, ensure_view};

/// One variant as reported by the supplier feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierVariant {
    /// Supplier-side SKU.
    pub sku: String,
    /// Current price at the supplier.
    pub price: Decimal,
    /// Units in stock, when the feed reports it.
    pub available_qty: Option<u32>,
    /// Whether the variant can currently be ordered.
    pub available: bool,
}

/// External price/stock feed, implemented outside this crate.
#[async_trait]
pub trait SupplierFeed: Send + Sync {
    /// Current variants for one supplier listing.
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] when the feed call fails.
    async fn get_supplier_variants(
        &self,
        supplier_type: SupplierType,
        source_id: &SourceId,
    ) -> Result<Vec<SupplierVariant>, UpstreamApiError>;
}

/// Insertable pending-change fields.
#[derive(Debug, Clone)]
pub struct NewProductChange {
    /// Affected product.
    pub product_id: ProductId,
    /// What changed.
    pub kind: ChangeKind,
    /// Old/new values and the affected SKU.
    pub payload: Value,
}

/// Persistence for pending changes; the production implementation is
/// [`crate::db::product_changes::PgProductChangeStore`].
#[async_trait]
pub trait ProductChangeSink: Send + Sync {
    /// Record one pending change.
    async fn record(&self, change: NewProductChange) -> Result<(), RepositoryError>;
}

/// Outcome counters for one bulk sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Suppliers whose feed call succeeded.
    pub suppliers_checked: usize,
    /// Suppliers whose feed call failed (logged, sync continued).
    pub suppliers_failed: usize,
    /// Pending changes recorded.
    pub changes_recorded: usize,
}

/// Runs the bulk supplier sync for one store.
pub struct SupplierSync {
    feed: Arc<dyn SupplierFeed>,
    changes: Arc<dyn ProductChangeSink>,
    permissions: Arc<dyn PermissionOracle>,
    cache: OrderCache,
}

impl SupplierSync {
    /// Assemble the sync from its collaborators.
    #[must_use]
    pub fn new(
        feed: Arc<dyn SupplierFeed>,
        changes: Arc<dyn ProductChangeSink>,
        permissions: Arc<dyn PermissionOracle>,
        cache: OrderCache,
    ) -> Self {
        Self {
            feed,
            changes,
            permissions,
            cache,
        }
    }

    /// Diff every supplier in the catalog against the feed and record
    /// pending changes. Guarded by the per-store sync lease so two bulk
    /// runs never overlap; a second caller gets an empty report.
    ///
    /// A single supplier's feed failure is logged and skipped - one dead
    /// listing must not abort the store-wide run.
    ///
    /// # Errors
    ///
    /// Permission and repository failures.
    #[instrument(skip(self, products), fields(store_id = %store_id, products = products.len()))]
    pub async fn sync_store(
        &self,
        user: UserId,
        store_id: StoreId,
        products: &[CatalogProduct],
    ) -> Result<SyncReport, OrderFlowError> {
        ensure_view(self.permissions.as_ref(), user, Resource::Store(store_id)).await?;

        if !self.cache.try_begin_sync(store_id).await {
            info!("Bulk supplier sync already in flight");
            return Ok(SyncReport::default());
        }

        // The lease is released on every exit path, including a failed
        // change write; otherwise the store stays unsyncable until the
        // lease TTL expires.
        let result = self.run_sync(products).await;
        self.cache.end_sync(store_id).await;
        let report = result?;
        info!(?report, "Bulk supplier sync finished");
        Ok(report)
    }

    async fn run_sync(
        &self,
        products: &[CatalogProduct],
    ) -> Result<SyncReport, OrderFlowError> {
        let mut report = SyncReport::default();
        for product in products {
            for supplier in &product.suppliers {
                let Some(source_id) = &supplier.source_id else {
                    continue;
                };
                let variants = match self
                    .feed
                    .get_supplier_variants(supplier.supplier_type, source_id)
                    .await
                {
                    Ok(variants) => variants,
                    Err(error) => {
                        warn!(
                            %error,
                            supplier_id = %supplier.id,
                            retryable = error.is_retryable(),
                            "Supplier feed call failed"
                        );
                        report.suppliers_failed += 1;
                        continue;
                    }
                };
                report.suppliers_checked += 1;

                for change in diff_variants(product.product.id, &supplier.variants_map, &variants)
                {
                    self.changes.record(change).await?;
                    report.changes_recorded += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Diff the stored variant map against the feed's current variants.
///
/// The stored map is the legacy blob shape: an object keyed by SKU whose
/// values carry at least a price. Anything unparseable is treated as an
/// unknown SKU rather than an error.
fn diff_variants(
    product_id: ProductId,
    stored_map: &Value,
    current: &[SupplierVariant],
) -> Vec<NewProductChange> {
    let stored = stored_map.as_object();
    let mut changes = Vec::new();

    for variant in current {
        let Some(entry) = stored.and_then(|m| m.get(&variant.sku)) else {
            changes.push(NewProductChange {
                product_id,
                kind: ChangeKind::VariantAdded,
                payload: json!({"sku": variant.sku, "price": variant.price.to_string()}),
            });
            continue;
        };
        if !variant.available {
            changes.push(NewProductChange {
                product_id,
                kind: ChangeKind::Availability,
                payload: json!({"sku": variant.sku, "available": false}),
            });
            continue;
        }
        let stored_price = entry
            .get("price")
            .map(parse_amount)
            .unwrap_or(Decimal::ZERO);
        if stored_price != variant.price {
            changes.push(NewProductChange {
                product_id,
                kind: ChangeKind::Price,
                payload: json!({
                    "sku": variant.sku,
                    "old": stored_price.to_string(),
                    "new": variant.price.to_string(),
                }),
            });
        }
    }

    if let Some(stored) = stored {
        for sku in stored.keys() {
            if !current.iter().any(|v| &v.sku == sku) {
                changes.push(NewProductChange {
                    product_id,
                    kind: ChangeKind::VariantRemoved,
                    payload: json!({"sku": sku}),
                });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrdersConfig;
    use crate::mapping::ProductMappings;
    use crate::models::{Product, Supplier};
    use chrono::Utc;
    use dropkit_core::SupplierId;
    use std::sync::Mutex;

    fn variant(sku: &str, price: &str, available: bool) -> SupplierVariant {
        SupplierVariant {
            sku: sku.into(),
            price: price.parse().unwrap(),
            available_qty: available.then_some(10),
            available,
        }
    }

    #[test]
    fn test_diff_detects_price_change() {
        let stored = json!({"A": {"price": "1.50"}});
        let changes = diff_variants(ProductId::new(1), &stored, &[variant("A", "2.00", true)]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Price);
        assert_eq!(changes[0].payload["old"], "1.50");
        assert_eq!(changes[0].payload["new"], "2.00");
    }

    #[test]
    fn test_diff_equal_price_is_quiet() {
        let stored = json!({"A": {"price": "1.50"}});
        let changes = diff_variants(ProductId::new(1), &stored, &[variant("A", "1.50", true)]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_diff_detects_added_removed_and_unavailable() {
        let stored = json!({"A": {"price": "1.50"}, "B": {"price": "3.00"}});
        let current = vec![variant("A", "1.50", false), variant("C", "5.00", true)];
        let changes = diff_variants(ProductId::new(1), &stored, &current);

        let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::Availability));
        assert!(kinds.contains(&ChangeKind::VariantAdded));
        assert!(kinds.contains(&ChangeKind::VariantRemoved));
        assert_eq!(changes.len(), 3);
    }

    struct FixedFeed(Vec<SupplierVariant>);

    #[async_trait]
    impl SupplierFeed for FixedFeed {
        async fn get_supplier_variants(
            &self,
            _supplier_type: SupplierType,
            _source_id: &SourceId,
        ) -> Result<Vec<SupplierVariant>, UpstreamApiError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemSink(Mutex<Vec<NewProductChange>>);

    #[async_trait]
    impl ProductChangeSink for MemSink {
        async fn record(&self, change: NewProductChange) -> Result<(), RepositoryError> {
            self.0.lock().unwrap().push(change);
            Ok(())
        }
    }

    struct AllowAll;

    #[async_trait]
    impl PermissionOracle for AllowAll {
        async fn can_view(&self, _user: UserId, _resource: Resource) -> bool {
            true
        }
        async fn can_edit(&self, _user: UserId, _resource: Resource) -> bool {
            true
        }
        async fn can_delete(&self, _user: UserId, _resource: Resource) -> bool {
            true
        }
    }

    fn catalog_product() -> CatalogProduct {
        CatalogProduct {
            product: Product {
                id: ProductId::new(1),
                store_id: StoreId::new(1),
                external_id: Some("ext-1".into()),
                title: "Widget".into(),
                data: Value::Null,
                mappings: ProductMappings::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            suppliers: vec![Supplier {
                id: SupplierId::new(1),
                product_id: ProductId::new(1),
                store_id: StoreId::new(1),
                source_url: "https://www.aliexpress.com/item/99.html".into(),
                supplier_name: "Vendor".into(),
                supplier_type: SupplierType::Aliexpress,
                source_id: Some(SourceId::new("99")),
                variants_map: json!({"A": {"price": "1.50"}}),
                is_default: true,
            }],
        }
    }

    #[tokio::test]
    async fn test_sync_records_changes_and_releases_lease() {
        let sink = Arc::new(MemSink::default());
        let sync = SupplierSync::new(
            Arc::new(FixedFeed(vec![variant("A", "2.00", true)])),
            sink.clone(),
            Arc::new(AllowAll),
            OrderCache::new(&OrdersConfig::default()),
        );
        let store = StoreId::new(1);

        let report = sync
            .sync_store(UserId::new(1), store, &[catalog_product()])
            .await
            .unwrap();
        assert_eq!(report.suppliers_checked, 1);
        assert_eq!(report.changes_recorded, 1);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
        assert!(!sync.cache.sync_in_progress(store).await);
    }

    struct FailingSink;

    #[async_trait]
    impl ProductChangeSink for FailingSink {
        async fn record(&self, _change: NewProductChange) -> Result<(), RepositoryError> {
            Err(RepositoryError::NotFound)
        }
    }

    #[tokio::test]
    async fn test_sync_releases_lease_when_change_write_fails() {
        let sync = SupplierSync::new(
            Arc::new(FixedFeed(vec![variant("A", "2.00", true)])),
            Arc::new(FailingSink),
            Arc::new(AllowAll),
            OrderCache::new(&OrdersConfig::default()),
        );
        let store = StoreId::new(1);

        let result = sync
            .sync_store(UserId::new(1), store, &[catalog_product()])
            .await;
        assert!(matches!(result, Err(OrderFlowError::Repository(_))));
        assert!(!sync.cache.sync_in_progress(store).await);

        // The next run is not refused by a leaked lease.
        assert!(sync.cache.try_begin_sync(store).await);
    }

    #[tokio::test]
    async fn test_sync_skips_when_lease_held() {
        let sync = SupplierSync::new(
            Arc::new(FixedFeed(vec![variant("A", "9.00", true)])),
            Arc::new(MemSink::default()),
            Arc::new(AllowAll),
            OrderCache::new(&OrdersConfig::default()),
        );
        let store = StoreId::new(1);
        assert!(sync.cache.try_begin_sync(store).await);

        let report = sync
            .sync_store(UserId::new(1), store, &[catalog_product()])
            .await
            .unwrap();
        assert_eq!(report, SyncReport::default());
    }
}
