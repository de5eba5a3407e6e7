//! Order line normalization.
//!
//! Takes one raw platform order plus the store's local catalog and produces
//! a display-ready line set: connected product, resolved supplier, shipping
//! method, per-line fulfillment status, and bundle sub-lines. For every line
//! with a resolved supplier on an order that is not stuck in a pending
//! payment gateway, a placement record is computed and cached - that record
//! is the entire hand-off contract to the place-order redirect flow.
//!
//! A line with no resolvable product is still emitted for display; it just
//! carries no placement record.

use dropkit_core::{
    AddressCorrection, AddressFlags, FulfillmentStatus, LineId, NormalizedAddress, OrderId,
    ProductId, SourceId, StoreId, SupplierId, SupplierType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::adapters::{RawLineItem, RawOrder};
use crate::address::normalize_address;
use crate::cache::OrderCache;
use crate::mapping::{ShippingRule, bundle_lines, resolve_shipping_method, resolve_supplier};
use crate::models::{BundleLine, Catalog, Store};
use crate::reconcile::{aggregate_status, line_status};

// =============================================================================
// Placement records
// =============================================================================

/// User-level ordering preferences applied to every generated placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderingPrefs {
    /// Free-text note prepended to the generated order note.
    pub custom_note: Option<String>,
    /// Prefer ePacket shipping at the supplier.
    pub epacket: bool,
    /// Shipping-method override applied when no per-variant rule matches.
    pub shipping_method: Option<String>,
    /// Mark the line as ordered automatically once placed.
    pub auto_mark_ordered: bool,
    /// Address-correction flags for the normalizer.
    pub address_flags: AddressFlags,
}

/// The cached payload consumed by the place-order redirect flow.
///
/// Keyed by the synthetic id `{store}_{order}_{line}`; short-lived and not
/// durable. Losing it only means the user re-triggers "place order".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Synthetic id, also the cache key.
    pub id: String,
    /// Platform order id.
    pub order_id: OrderId,
    /// Platform line id.
    pub line_id: LineId,
    /// Resolved supplier.
    pub supplier_id: SupplierId,
    /// Supplier-side product id.
    pub source_id: SourceId,
    /// Supplier listing URL.
    pub source_url: String,
    /// Sourcing platform.
    pub supplier_type: SupplierType,
    /// Units to order.
    pub quantity: u32,
    /// Line total (unit price times quantity).
    pub total: Decimal,
    /// Order currency code.
    pub currency: String,
    /// Corrected shipping address.
    pub address: NormalizedAddress,
    /// Corrections the normalizer applied, for display/logging.
    pub corrections: Vec<AddressCorrection>,
    /// Generated order note text.
    pub note: String,
    /// Preselected shipping method, when a rule matched.
    pub shipping_method: Option<String>,
    /// Prefer ePacket at the supplier.
    pub epacket: bool,
    /// Mark as ordered automatically once placed.
    pub auto_mark_ordered: bool,
    /// Affiliate-tagged redirect URL; attached by the redirect flow on read.
    pub order_url: Option<String>,
}

/// Build the synthetic placement id for a (store, order, line) triple.
#[must_use]
pub fn placement_id(store: StoreId, order: &OrderId, line: &LineId) -> String {
    format!("{store}_{order}_{line}")
}

// =============================================================================
// Normalized lines
// =============================================================================

/// One normalized order line.
#[derive(Debug, Clone)]
pub struct OrderLine {
    /// The platform line as received.
    pub raw: RawLineItem,
    /// Connected local product, when the catalog knows the line's product.
    pub product_id: Option<ProductId>,
    /// Resolved supplier, when the product has one.
    pub supplier_id: Option<SupplierId>,
    /// Matched shipping rule, when one is configured for the destination.
    pub shipping_method: Option<ShippingRule>,
    /// Fulfillment status from shipment cross-referencing.
    pub fulfillment: FulfillmentStatus,
    /// Bundle constituents, when the line's variant is a bundle.
    pub bundle_lines: Vec<BundleLine>,
    /// Cache key of the generated placement record, when one was written.
    pub placement_key: Option<String>,
}

/// One normalized order.
#[derive(Debug, Clone)]
pub struct NormalizedOrder {
    /// Platform order id.
    pub order_id: OrderId,
    /// Display number.
    pub number: String,
    /// The order sits in a pending PayPal/Amazon payment state; no
    /// placement records were generated.
    pub pending_payment: bool,
    /// Normalized lines, in platform order.
    pub lines: Vec<OrderLine>,
    /// Aggregate fulfillment status; `None` when no line is fulfilled.
    pub fulfillment: Option<FulfillmentStatus>,
}

// =============================================================================
// Normalizer
// =============================================================================

/// Normalizes raw orders into display lines and cached placement records.
#[derive(Clone)]
pub struct LineNormalizer {
    cache: OrderCache,
    affiliate_key: Option<String>,
}

impl LineNormalizer {
    /// Create a normalizer writing placements into `cache`.
    #[must_use]
    pub fn new(cache: OrderCache, affiliate_key: Option<String>) -> Self {
        Self {
            cache,
            affiliate_key,
        }
    }

    /// Normalize one order against the store's catalog.
    ///
    /// Per-line processing is independent; the aggregate status is computed
    /// only after every line has been visited.
    #[instrument(skip(self, store, catalog, order, prefs), fields(store_id = %store.id, order_id = %order.id))]
    pub async fn normalize_order(
        &self,
        store: &Store,
        catalog: &Catalog,
        order: &RawOrder,
        prefs: &OrderingPrefs,
    ) -> NormalizedOrder {
        let pending_payment = order.is_pending_payment();
        let country_code = order
            .shipping_address
            .country_code
            .clone()
            .unwrap_or_default();

        let mut lines = Vec::with_capacity(order.line_items.len());
        for raw in &order.line_items {
            let product = raw
                .product_external_id
                .as_deref()
                .and_then(|ext| catalog.get(ext));

            let supplier = product
                .and_then(|p| resolve_supplier(p, raw.variant_id.as_ref(), None));

            let shipping_method = product.zip(supplier).and_then(|(p, s)| {
                resolve_shipping_method(
                    &p.product.mappings,
                    s.id,
                    raw.variant_id.as_ref(),
                    &country_code,
                )
                .cloned()
            });

            let bundles = product
                .zip(raw.variant_id.as_ref())
                .map(|(p, variant)| bundle_lines(&p.product.mappings, variant, raw.quantity))
                .unwrap_or_default();

            let mut placement_key = None;
            if !pending_payment
                && let Some(supplier) = supplier
                && let Some(source_id) = &supplier.source_id
            {
                let record = self.build_placement(
                    store,
                    order,
                    raw,
                    supplier.id,
                    source_id.clone(),
                    supplier.source_url.clone(),
                    supplier.supplier_type,
                    shipping_method.as_ref(),
                    prefs,
                );
                placement_key = Some(record.id.clone());
                self.cache.put_placement(store.id, record).await;
            } else if supplier.is_none() {
                debug!(line_id = %raw.id, sku = %raw.sku, "Line has no resolvable supplier");
            }

            lines.push(OrderLine {
                raw: raw.clone(),
                product_id: product.map(|p| p.product.id),
                supplier_id: supplier.map(|s| s.id),
                shipping_method,
                fulfillment: line_status(&raw.sku, &order.shipments),
                bundle_lines: bundles,
                placement_key,
            });
        }

        let statuses: Vec<_> = lines
            .iter()
            .map(|l| (l.raw.id.clone(), l.fulfillment))
            .collect();
        NormalizedOrder {
            order_id: order.id.clone(),
            number: order.number.clone(),
            pending_payment,
            lines,
            fulfillment: aggregate_status(&statuses),
        }
    }

    /// Read a cached placement, attach the affiliate-tagged redirect URL,
    /// and rewrite it before expiry. Returns `None` when the record expired
    /// (the user re-triggers "place order").
    pub async fn attach_order_url(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Option<PlacementRecord> {
        let mut record = self.cache.get_placement(store, order, line).await?;
        record.order_url = Some(self.affiliate_url(&record));
        self.cache.put_placement(store, record.clone()).await;
        Some(record)
    }

    fn affiliate_url(&self, record: &PlacementRecord) -> String {
        let base = match record.supplier_type {
            SupplierType::Aliexpress => {
                format!("https://www.aliexpress.com/item/{}.html", record.source_id)
            }
            SupplierType::Ebay => format!("https://www.ebay.com/itm/{}", record.source_id),
            SupplierType::Other => record.source_url.clone(),
        };
        let Ok(mut url) = Url::parse(&base) else {
            return base;
        };
        if let Some(key) = &self.affiliate_key {
            url.query_pairs_mut().append_pair("aff_key", key);
        }
        url.into()
    }

    #[allow(clippy::too_many_arguments)]
    fn build_placement(
        &self,
        store: &Store,
        order: &RawOrder,
        raw: &RawLineItem,
        supplier_id: SupplierId,
        source_id: SourceId,
        source_url: String,
        supplier_type: SupplierType,
        shipping: Option<&ShippingRule>,
        prefs: &OrderingPrefs,
    ) -> PlacementRecord {
        let (address, corrections) = normalize_address(
            &order.shipping_address,
            order.phone.as_deref(),
            &prefs.address_flags,
        );
        let shipping_method = shipping
            .map(|rule| rule.method.clone())
            .or_else(|| prefs.shipping_method.clone());

        PlacementRecord {
            id: placement_id(store.id, &order.id, &raw.id),
            order_id: order.id.clone(),
            line_id: raw.id.clone(),
            supplier_id,
            source_id,
            source_url,
            supplier_type,
            quantity: raw.quantity,
            total: raw.price * Decimal::from(raw.quantity),
            currency: order.currency.clone(),
            address,
            corrections,
            note: build_note(order, raw, prefs),
            shipping_method,
            epacket: prefs.epacket,
            auto_mark_ordered: prefs.auto_mark_ordered,
            order_url: None,
        }
    }
}

/// Generate the order note text for one line.
///
/// Line-item properties whose key starts with `_` are internal and excluded.
fn build_note(order: &RawOrder, line: &RawLineItem, prefs: &OrderingPrefs) -> String {
    let mut parts = Vec::new();
    if let Some(custom) = &prefs.custom_note
        && !custom.is_empty()
    {
        parts.push(custom.clone());
    }
    parts.push(format!("Order {} - {} x{}", order.number, line.title, line.quantity));
    for (key, value) in &line.properties {
        if !key.starts_with('_') {
            parts.push(format!("{key}: {value}"));
        }
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Shipment;
    use crate::config::OrdersConfig;
    use crate::mapping::ProductMappings;
    use crate::models::{CatalogProduct, Product, Supplier};
    use chrono::Utc;
    use dropkit_core::{FinancialStatus, Platform, RawAddress, UserId, VariantId};

    fn test_store() -> Store {
        Store {
            id: StoreId::new(1),
            user_id: UserId::new(1),
            platform: Platform::Shopify,
            instance: 1,
            title: "Test Store".into(),
            api_url: "https://test.myshopify.com".into(),
            currency_format: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn catalog_with_supplier() -> Catalog {
        let product = Product {
            id: ProductId::new(11),
            store_id: StoreId::new(1),
            external_id: Some("ext-11".into()),
            title: "Widget".into(),
            data: serde_json::Value::Null,
            mappings: ProductMappings::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let supplier = Supplier {
            id: SupplierId::new(21),
            product_id: ProductId::new(11),
            store_id: StoreId::new(1),
            source_url: "https://www.aliexpress.com/item/4000123.html".into(),
            supplier_name: "Vendor".into(),
            supplier_type: SupplierType::Aliexpress,
            source_id: Some(SourceId::new("4000123")),
            variants_map: serde_json::Value::Null,
            is_default: true,
        };
        Catalog::new(vec![CatalogProduct {
            product,
            suppliers: vec![supplier],
        }])
    }

    fn raw_order(gateway: &str, financial: FinancialStatus) -> RawOrder {
        RawOrder {
            id: OrderId::new("500"),
            number: "#1001".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            financial_status: financial,
            gateway: gateway.into(),
            currency: "USD".into(),
            customer_email: None,
            shipping_address: RawAddress {
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                address1: Some("1 Main St".into()),
                city: Some("Springfield".into()),
                province_code: Some("IL".into()),
                zip: Some("62701".into()),
                country_code: Some("US".into()),
                ..Default::default()
            },
            billing_address: None,
            phone: Some("+1 555 0100".into()),
            note: None,
            line_items: vec![RawLineItem {
                id: LineId::new("1"),
                sku: "SKU-1".into(),
                title: "Widget".into(),
                product_external_id: Some("ext-11".into()),
                variant_id: Some(VariantId::new("v1")),
                variant_title: None,
                quantity: 2,
                price: Decimal::new(1599, 2),
                properties: vec![
                    ("Engraving".into(), "JD".into()),
                    ("_internal_ref".into(), "abc".into()),
                ],
            }],
            shipments: vec![],
            total: Decimal::new(3198, 2),
            cancelled_at: None,
        }
    }

    fn normalizer() -> LineNormalizer {
        LineNormalizer::new(
            OrderCache::new(&OrdersConfig::default()),
            Some("AFF123".into()),
        )
    }

    #[tokio::test]
    async fn test_placement_written_for_resolved_supplier() {
        let normalizer = normalizer();
        let store = test_store();
        let order = raw_order("shopify_payments", FinancialStatus::Paid);

        let normalized = normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &OrderingPrefs::default())
            .await;

        let line = &normalized.lines[0];
        assert_eq!(line.supplier_id, Some(SupplierId::new(21)));
        assert_eq!(line.placement_key.as_deref(), Some("1_500_1"));

        let record = normalizer
            .cache
            .get_placement(store.id, &order.id, &LineId::new("1"))
            .await
            .unwrap();
        assert_eq!(record.quantity, 2);
        assert_eq!(record.total, Decimal::new(3198, 2));
        assert_eq!(record.source_id, SourceId::new("4000123"));
        assert_eq!(record.address.country, "United States");
    }

    #[tokio::test]
    async fn test_pending_paypal_order_gets_no_placements() {
        let normalizer = normalizer();
        let store = test_store();
        let order = raw_order("paypal", FinancialStatus::Pending);

        let normalized = normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &OrderingPrefs::default())
            .await;

        assert!(normalized.pending_payment);
        assert!(normalized.lines[0].placement_key.is_none());
        assert!(
            normalizer
                .cache
                .get_placement(store.id, &order.id, &LineId::new("1"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_product_line_still_emitted() {
        let normalizer = normalizer();
        let store = test_store();
        let mut order = raw_order("shopify_payments", FinancialStatus::Paid);
        order.line_items[0].product_external_id = Some("ext-unknown".into());

        let normalized = normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &OrderingPrefs::default())
            .await;

        let line = &normalized.lines[0];
        assert!(line.product_id.is_none());
        assert!(line.supplier_id.is_none());
        assert!(line.placement_key.is_none());
        assert_eq!(normalized.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_note_excludes_internal_properties() {
        let normalizer = normalizer();
        let store = test_store();
        let order = raw_order("shopify_payments", FinancialStatus::Paid);
        let prefs = OrderingPrefs {
            custom_note: Some("Thank you!".into()),
            ..Default::default()
        };

        normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &prefs)
            .await;

        let record = normalizer
            .cache
            .get_placement(store.id, &order.id, &LineId::new("1"))
            .await
            .unwrap();
        assert!(record.note.starts_with("Thank you!\n"));
        assert!(record.note.contains("Engraving: JD"));
        assert!(!record.note.contains("_internal_ref"));
    }

    #[tokio::test]
    async fn test_attach_order_url_tags_affiliate_key() {
        let normalizer = normalizer();
        let store = test_store();
        let order = raw_order("shopify_payments", FinancialStatus::Paid);

        normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &OrderingPrefs::default())
            .await;

        let record = normalizer
            .attach_order_url(store.id, &order.id, &LineId::new("1"))
            .await
            .unwrap();
        let url = record.order_url.unwrap();
        assert!(url.starts_with("https://www.aliexpress.com/item/4000123.html"));
        assert!(url.contains("aff_key=AFF123"));

        // The rewrite is persisted back into the cache.
        let cached = normalizer
            .cache
            .get_placement(store.id, &order.id, &LineId::new("1"))
            .await
            .unwrap();
        assert!(cached.order_url.is_some());
    }

    #[tokio::test]
    async fn test_aggregate_reflects_shipments() {
        let normalizer = normalizer();
        let store = test_store();
        let mut order = raw_order("shopify_payments", FinancialStatus::Paid);
        order.line_items.push(RawLineItem {
            id: LineId::new("2"),
            sku: "SKU-2".into(),
            title: "Gadget".into(),
            product_external_id: None,
            variant_id: None,
            variant_title: None,
            quantity: 1,
            price: Decimal::ONE,
            properties: vec![],
        });
        order.shipments = vec![Shipment {
            id: "s1".into(),
            tracking_number: None,
            carrier: None,
            skus: vec!["SKU-1".into()],
        }];

        let normalized = normalizer
            .normalize_order(&store, &catalog_with_supplier(), &order, &OrderingPrefs::default())
            .await;

        assert_eq!(normalized.lines[0].fulfillment, FulfillmentStatus::Fulfilled);
        assert_eq!(normalized.lines[1].fulfillment, FulfillmentStatus::Unfulfilled);
        assert_eq!(
            normalized.fulfillment,
            Some(FulfillmentStatus::PartiallyFulfilled)
        );
    }

    #[tokio::test]
    async fn test_bundle_quantities_multiply_by_parent() {
        let normalizer = normalizer();
        let store = test_store();
        let order = raw_order("shopify_payments", FinancialStatus::Paid);

        let mut mappings = ProductMappings::default();
        mappings.bundles.insert(
            "v1".into(),
            vec![
                crate::mapping::BundleEntry {
                    product_id: ProductId::new(31),
                    variant_id: VariantId::new("c1"),
                    sku: "A".into(),
                    quantity: 2,
                },
                crate::mapping::BundleEntry {
                    product_id: ProductId::new(32),
                    variant_id: VariantId::new("c2"),
                    sku: "B".into(),
                    quantity: 1,
                },
            ],
        );
        let product = Product {
            id: ProductId::new(11),
            store_id: store.id,
            external_id: Some("ext-11".into()),
            title: "Bundle".into(),
            data: serde_json::Value::Null,
            mappings,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let catalog = Catalog::new(vec![CatalogProduct {
            product,
            suppliers: vec![],
        }]);

        let mut order = order;
        order.line_items[0].quantity = 3;
        let normalized = normalizer
            .normalize_order(&store, &catalog, &order, &OrderingPrefs::default())
            .await;

        let quantities: Vec<u32> = normalized.lines[0]
            .bundle_lines
            .iter()
            .map(|b| b.quantity)
            .collect();
        assert_eq!(quantities, vec![6, 3]);
    }
}
