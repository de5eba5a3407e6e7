//! Shared test doubles for the Dropkit pipeline.
//!
//! Every boundary trait the pipeline consumes has an in-memory double here
//! so the `tests/` suites can exercise whole flows without Postgres or a
//! live platform API: a track store over a `HashMap`, a store adapter with
//! scripted orders and a recorded note, an order mirror, a search index,
//! an allow-all permission oracle, and a counting notification sink.

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{
    FinancialStatus, FulfillmentStatus, LineId, OrderId, Platform, ProductId, RawAddress,
    SourceId, SourceStatus, StoreId, SupplierId, SupplierType, TrackId, UserId, VariantId,
};
use dropkit_orders::adapters::{
    OrderFilters, OrderPage, RawLineItem, RawOrder, Shipment, StoreAdapter,
};
use dropkit_orders::db::RepositoryError;
use dropkit_orders::error::UpstreamApiError;
use dropkit_orders::mapping::ProductMappings;
use dropkit_orders::models::{CatalogProduct, NewTrack, OrderTrack, Product, Store, Supplier};
use dropkit_orders::notify::{NotificationSink, OrderAlert};
use dropkit_orders::permissions::{PermissionOracle, Resource};
use dropkit_orders::sync::{OrderMirror, SearchIndex};
use dropkit_orders::tracks::TrackStore;
use rust_decimal::Decimal;

// =============================================================================
// Fixtures
// =============================================================================

/// A connected Shopify store owned by user 1.
#[must_use]
pub fn test_store() -> Store {
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

/// A paid order with one mapped line (`SKU-1`, product `ext-11`).
#[must_use]
pub fn paid_order(id: &str) -> RawOrder {
    RawOrder {
        id: OrderId::new(id),
        number: format!("#{id}"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        financial_status: FinancialStatus::Paid,
        gateway: "shopify_payments".into(),
        currency: "USD".into(),
        customer_email: Some("buyer@example.com".into()),
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
            properties: vec![],
        }],
        shipments: vec![],
        total: Decimal::new(3198, 2),
        cancelled_at: None,
    }
}

/// A catalog containing product `ext-11` with one default AliExpress
/// supplier (source id `4000123`).
#[must_use]
pub fn mapped_catalog() -> Vec<CatalogProduct> {
    vec![CatalogProduct {
        product: Product {
            id: ProductId::new(11),
            store_id: StoreId::new(1),
            external_id: Some("ext-11".into()),
            title: "Widget".into(),
            data: serde_json::Value::Null,
            mappings: ProductMappings::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        suppliers: vec![Supplier {
            id: SupplierId::new(21),
            product_id: ProductId::new(11),
            store_id: StoreId::new(1),
            source_url: "https://www.aliexpress.com/item/4000123.html".into(),
            supplier_name: "Vendor".into(),
            supplier_type: SupplierType::Aliexpress,
            source_id: Some(SourceId::new("4000123")),
            variants_map: serde_json::Value::Null,
            is_default: true,
        }],
    }]
}

// =============================================================================
// Track store double
// =============================================================================

/// In-memory [`TrackStore`].
#[derive(Default)]
pub struct InMemoryTrackStore {
    rows: Mutex<HashMap<TrackId, OrderTrack>>,
    next_id: AtomicI64,
}

impl InMemoryTrackStore {
    /// All rows, sorted by id.
    #[must_use]
    pub fn all(&self) -> Vec<OrderTrack> {
        let mut rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|t| t.id);
        rows
    }

    /// Fetch one row by id, panicking when absent.
    ///
    /// # Panics
    ///
    /// When no row with that id exists.
    #[must_use]
    pub fn store_row(&self, id: TrackId) -> OrderTrack {
        self.rows.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl TrackStore for InMemoryTrackStore {
    async fn find(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| t.store_id == store && &t.order_id == order && &t.line_id == line)
            .collect())
    }

    async fn find_by_source(
        &self,
        store: StoreId,
        source: &SourceId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| t.store_id == store && t.source_id.as_ref() == Some(source))
            .collect())
    }

    async fn find_for_order(
        &self,
        store: StoreId,
        order: &OrderId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| t.store_id == store && &t.order_id == order)
            .collect())
    }

    async fn get(&self, id: TrackId) -> Result<Option<OrderTrack>, RepositoryError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, track: NewTrack) -> Result<OrderTrack, RepositoryError> {
        let id = TrackId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let row = OrderTrack {
            id,
            store_id: track.store_id,
            order_id: track.order_id,
            line_id: track.line_id,
            source_id: track.source_id,
            source_type: track.source_type,
            source_status: SourceStatus::default(),
            store_status: FulfillmentStatus::Unfulfilled,
            tracking_number: None,
            hidden: false,
            seen: false,
            data: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            status_updated_at: now,
        };
        self.rows.lock().unwrap().insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, track: &OrderTrack) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().insert(track.id, track.clone());
        Ok(())
    }

    async fn delete(&self, id: TrackId) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn delete_order_items(&self, _track: TrackId) -> Result<u64, RepositoryError> {
        Ok(0)
    }
}

// =============================================================================
// Store adapter double
// =============================================================================

/// Scripted [`StoreAdapter`]: serves a fixed order list and records note
/// traffic.
#[derive(Default)]
pub struct MockStoreAdapter {
    /// Orders returned by `list_orders`.
    pub orders: Mutex<Vec<RawOrder>>,
    /// Current merchant note per order.
    pub notes: Mutex<HashMap<String, String>>,
    /// Number of `set_order_note` calls.
    pub note_writes: AtomicUsize,
}

impl MockStoreAdapter {
    /// Adapter pre-loaded with orders.
    #[must_use]
    pub fn with_orders(orders: Vec<RawOrder>) -> Self {
        Self {
            orders: Mutex::new(orders),
            ..Default::default()
        }
    }
}

#[async_trait]
impl StoreAdapter for MockStoreAdapter {
    fn platform(&self) -> Platform {
        Platform::Shopify
    }

    async fn list_orders(
        &self,
        _filters: &OrderFilters,
        _page: u32,
        _per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError> {
        let orders = self.orders.lock().unwrap().clone();
        let total = orders.len() as u64;
        Ok(OrderPage {
            orders,
            total_count: total,
        })
    }

    async fn get_order_shipments(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Shipment>, UpstreamApiError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| &o.id == order_id)
            .map(|o| o.shipments.clone())
            .unwrap_or_default())
    }

    async fn update_order_status(
        &self,
        _order_id: &OrderId,
        _payload: &serde_json::Value,
    ) -> Result<(), UpstreamApiError> {
        Ok(())
    }

    async fn get_order_note(&self, order_id: &OrderId) -> Result<Option<String>, UpstreamApiError> {
        Ok(self.notes.lock().unwrap().get(order_id.as_str()).cloned())
    }

    async fn set_order_note(&self, order_id: &OrderId, note: &str) -> Result<(), UpstreamApiError> {
        self.notes
            .lock()
            .unwrap()
            .insert(order_id.as_str().to_string(), note.to_string());
        self.note_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Mirror and search doubles
// =============================================================================

/// In-memory [`OrderMirror`] counting upserts.
#[derive(Default)]
pub struct InMemoryMirror {
    orders: Mutex<HashMap<String, RawOrder>>,
    /// Number of `upsert_order` calls.
    pub upserts: AtomicUsize,
}

impl InMemoryMirror {
    /// Seed the mirror with an already-synced order.
    pub fn seed(&self, order: RawOrder) {
        self.orders
            .lock()
            .unwrap()
            .insert(order.id.as_str().to_string(), order);
    }
}

#[async_trait]
impl OrderMirror for InMemoryMirror {
    async fn query_orders(
        &self,
        _store: StoreId,
        _filters: &OrderFilters,
        _page: u32,
        _per_page: u32,
    ) -> Result<OrderPage, RepositoryError> {
        let orders: Vec<RawOrder> = self.orders.lock().unwrap().values().cloned().collect();
        let total = orders.len() as u64;
        Ok(OrderPage {
            orders,
            total_count: total,
        })
    }

    async fn synced_updated_at(
        &self,
        _store: StoreId,
        order: &OrderId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .get(order.as_str())
            .map(|o| o.updated_at))
    }

    async fn upsert_order(&self, _store: StoreId, order: &RawOrder) -> Result<(), RepositoryError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.seed(order.clone());
        Ok(())
    }
}

/// [`SearchIndex`] double serving a fixed page.
#[derive(Default)]
pub struct FixedSearchIndex {
    /// Orders returned by every query.
    pub orders: Vec<RawOrder>,
}

#[async_trait]
impl SearchIndex for FixedSearchIndex {
    async fn search_orders(
        &self,
        _store: StoreId,
        _filters: &OrderFilters,
        _page: u32,
        _per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError> {
        Ok(OrderPage {
            orders: self.orders.clone(),
            total_count: self.orders.len() as u64,
        })
    }
}

// =============================================================================
// Permission and notification doubles
// =============================================================================

/// Oracle that grants everything.
pub struct AllowAll;

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

/// Oracle that denies everything.
pub struct DenyAll;

#[async_trait]
impl PermissionOracle for DenyAll {
    async fn can_view(&self, _user: UserId, _resource: Resource) -> bool {
        false
    }
    async fn can_edit(&self, _user: UserId, _resource: Resource) -> bool {
        false
    }
    async fn can_delete(&self, _user: UserId, _resource: Resource) -> bool {
        false
    }
}

/// Sink recording every alert.
#[derive(Default)]
pub struct RecordingSink {
    /// Delivered alerts, in order.
    pub alerts: Mutex<Vec<OrderAlert>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, alert: OrderAlert) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }
}
