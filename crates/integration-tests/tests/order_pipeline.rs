//! End-to-end pipeline flow: normalize an order against the catalog, cache
//! and read back the placement record, attach the supplier order id in the
//! ledger, then reconcile fulfillment once shipments appear.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use dropkit_core::{FulfillmentStatus, LineId, OrderId, SourceId, SupplierType, UserId, VariantId};
use dropkit_integration_tests::{
    AllowAll, InMemoryTrackStore, MockStoreAdapter, RecordingSink, mapped_catalog, paid_order,
    test_store,
};
use dropkit_orders::adapters::{RawLineItem, Shipment};
use dropkit_orders::cache::OrderCache;
use dropkit_orders::config::OrdersConfig;
use dropkit_orders::lines::{LineNormalizer, OrderingPrefs};
use dropkit_orders::models::Catalog;
use dropkit_orders::reconcile::reconcile_order;
use dropkit_orders::tracks::{TrackLedger, TrackRequest};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_order_flows_from_normalization_to_fulfillment() {
    let store = test_store();
    let catalog = Catalog::new(mapped_catalog());
    let mut order = paid_order("500");

    let cache = OrderCache::new(&OrdersConfig::default());
    let normalizer = LineNormalizer::new(cache.clone(), Some("dk-aff".into()));

    // Normalize: the single mapped line resolves its supplier and caches a
    // placement record.
    let normalized = normalizer
        .normalize_order(&store, &catalog, &order, &OrderingPrefs::default())
        .await;
    assert_eq!(normalized.lines.len(), 1);
    let line = &normalized.lines[0];
    assert!(line.supplier_id.is_some());
    assert_eq!(line.placement_key.as_deref(), Some("1_500_1"));
    assert!(normalized.fulfillment.is_none());

    // The place-order redirect reads the record back and gets an
    // affiliate-tagged URL.
    let record = normalizer
        .attach_order_url(store.id, &order.id, &LineId::new("1"))
        .await
        .unwrap();
    let url = record.order_url.unwrap();
    assert!(url.contains("aliexpress.com/item/4000123"));
    assert!(url.contains("aff_key=dk-aff"));
    assert_eq!(record.quantity, 2);
    assert_eq!(record.total, Decimal::new(3198, 2));

    // The user places the supplier order; the ledger records it and writes
    // the order note once.
    let tracks = Arc::new(InMemoryTrackStore::default());
    let adapter = MockStoreAdapter::default();
    let ledger = TrackLedger::new(
        tracks.clone(),
        Arc::new(AllowAll),
        Arc::new(RecordingSink::default()),
        cache,
    );
    let request = TrackRequest {
        order_id: order.id.clone(),
        line_id: LineId::new("1"),
        source_id: SourceId::new("9001"),
        source_type: SupplierType::Aliexpress,
        forced: false,
    };
    let (track, created) = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request.clone())
        .await
        .unwrap();
    assert!(created);
    let note = adapter.notes.lock().unwrap().get("500").cloned().unwrap();
    assert!(note.contains("AliExpress order ID: 9001"));

    // Replaying the same attachment is a no-op on the note.
    let (_, created_again) = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request)
        .await
        .unwrap();
    assert!(!created_again);
    assert_eq!(adapter.note_writes.load(Ordering::SeqCst), 1);

    // The platform ships the line; reconciliation flips both the aggregate
    // and the persisted track status.
    order.shipments = vec![Shipment {
        id: "ship-1".into(),
        tracking_number: Some("LP0001".into()),
        carrier: Some("cainiao".into()),
        skus: vec!["SKU-1".into()],
    }];
    let fulfillment = reconcile_order(tracks.as_ref(), store.id, &order)
        .await
        .unwrap();
    assert_eq!(fulfillment.aggregate, Some(FulfillmentStatus::Fulfilled));

    let row = tracks.store_row(track.id);
    assert_eq!(row.store_status, FulfillmentStatus::Fulfilled);
}

#[tokio::test]
async fn test_partial_shipment_yields_partial_aggregate() {
    let store = test_store();
    let mut order = paid_order("600");
    order.line_items = (1..=3)
        .map(|n| RawLineItem {
            id: LineId::new(n.to_string()),
            sku: format!("SKU-{n}"),
            title: format!("Item {n}"),
            product_external_id: None,
            variant_id: Some(VariantId::new(format!("v{n}"))),
            variant_title: None,
            quantity: 1,
            price: Decimal::ONE,
            properties: vec![],
        })
        .collect();
    order.shipments = vec![
        Shipment {
            id: "s1".into(),
            tracking_number: None,
            carrier: None,
            skus: vec!["SKU-1".into()],
        },
        Shipment {
            id: "s2".into(),
            tracking_number: None,
            carrier: None,
            skus: vec!["SKU-3".into()],
        },
    ];

    let tracks = InMemoryTrackStore::default();
    let fulfillment = reconcile_order(&tracks, store.id, &order).await.unwrap();

    assert_eq!(
        fulfillment.aggregate,
        Some(FulfillmentStatus::PartiallyFulfilled)
    );
    let by_line = |id: &str| {
        fulfillment
            .lines
            .iter()
            .find(|(l, _)| *l == LineId::new(id))
            .map(|(_, s)| *s)
            .unwrap()
    };
    assert_eq!(by_line("1"), FulfillmentStatus::Fulfilled);
    assert_eq!(by_line("2"), FulfillmentStatus::Unfulfilled);
    assert_eq!(by_line("3"), FulfillmentStatus::Fulfilled);
}

#[tokio::test]
async fn test_pending_paypal_order_produces_no_placement() {
    let store = test_store();
    let catalog = Catalog::new(mapped_catalog());
    let mut order = paid_order("700");
    order.financial_status = dropkit_core::FinancialStatus::Pending;
    order.gateway = "paypal".into();

    let cache = OrderCache::new(&OrdersConfig::default());
    let normalizer = LineNormalizer::new(cache.clone(), None);
    let normalized = normalizer
        .normalize_order(&store, &catalog, &order, &OrderingPrefs::default())
        .await;

    assert!(normalized.pending_payment);
    assert!(normalized.lines[0].placement_key.is_none());
    assert!(
        cache
            .get_placement(store.id, &OrderId::new("700"), &LineId::new("1"))
            .await
            .is_none()
    );
}
