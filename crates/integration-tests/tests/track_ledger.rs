//! Ledger guarantees under contention and conflict: concurrent attachment
//! convergence, supplier-order-id reuse rejection, and the cancellation
//! alert.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use dropkit_core::{LineId, OrderId, SourceId, SourceStatus, SupplierType, UserId};
use dropkit_integration_tests::{
    AllowAll, DenyAll, InMemoryTrackStore, MockStoreAdapter, RecordingSink, test_store,
};
use dropkit_orders::OrderFlowError;
use dropkit_orders::cache::OrderCache;
use dropkit_orders::config::OrdersConfig;
use dropkit_orders::notify::OrderAlert;
use dropkit_orders::tracks::{TrackLedger, TrackRequest, TrackUpdate};

fn ledger(tracks: Arc<InMemoryTrackStore>, sink: Arc<RecordingSink>) -> TrackLedger {
    TrackLedger::new(
        tracks,
        Arc::new(AllowAll),
        sink,
        OrderCache::new(&OrdersConfig::default()),
    )
}

fn request(order: &str, line: &str, source: &str) -> TrackRequest {
    TrackRequest {
        order_id: OrderId::new(order),
        line_id: LineId::new(line),
        source_id: SourceId::new(source),
        source_type: SupplierType::Aliexpress,
        forced: false,
    }
}

#[tokio::test]
async fn test_concurrent_attachments_converge_to_one_row() {
    let store = test_store();
    let tracks = Arc::new(InMemoryTrackStore::default());
    let ledger = ledger(tracks.clone(), Arc::new(RecordingSink::default()));
    let adapter = Arc::new(MockStoreAdapter::default());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        let store = store.clone();
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .create_or_update_track(
                    UserId::new(1),
                    &store,
                    adapter.as_ref(),
                    request("900", "1", "42"),
                )
                .await
        }));
    }

    let mut creations = 0;
    for handle in handles {
        let (track, created) = handle.await.unwrap().unwrap();
        assert_eq!(track.source_id, Some(SourceId::new("42")));
        creations += usize::from(created);
    }

    assert_eq!(creations, 1);
    assert_eq!(tracks.all().len(), 1);
    // The note append is idempotent across the replays.
    assert_eq!(adapter.note_writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_source_reuse_across_orders_rejected_unless_forced() {
    let store = test_store();
    let tracks = Arc::new(InMemoryTrackStore::default());
    let ledger = ledger(tracks.clone(), Arc::new(RecordingSink::default()));
    let adapter = MockStoreAdapter::default();

    ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request("100", "1", "777"))
        .await
        .unwrap();

    let err = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request("200", "1", "777"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::SupplierOrderReuse { ref other_order, .. }
            if *other_order == OrderId::new("100")
    ));

    let mut forced = request("200", "1", "777");
    forced.forced = true;
    let (_, created) = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, forced)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(tracks.all().len(), 2);
}

#[tokio::test]
async fn test_conflicting_id_on_same_line_rejected_unless_forced() {
    let store = test_store();
    let tracks = Arc::new(InMemoryTrackStore::default());
    let ledger = ledger(tracks.clone(), Arc::new(RecordingSink::default()));
    let adapter = MockStoreAdapter::default();

    ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request("100", "1", "111"))
        .await
        .unwrap();

    let err = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request("100", "1", "222"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::DuplicateSupplierOrder { .. }));

    let mut forced = request("100", "1", "222");
    forced.forced = true;
    let (track, created) = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, forced)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(track.source_id, Some(SourceId::new("222")));
    assert_eq!(tracks.all().len(), 1);
}

#[tokio::test]
async fn test_permission_denied_blocks_attachment() {
    let store = test_store();
    let ledger = TrackLedger::new(
        Arc::new(InMemoryTrackStore::default()),
        Arc::new(DenyAll),
        Arc::new(RecordingSink::default()),
        OrderCache::new(&OrdersConfig::default()),
    );
    let adapter = MockStoreAdapter::default();

    let err = ledger
        .create_or_update_track(UserId::new(2), &store, &adapter, request("100", "1", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_cancellation_transition_alerts_once() {
    let store = test_store();
    let tracks = Arc::new(InMemoryTrackStore::default());
    let sink = Arc::new(RecordingSink::default());
    let ledger = ledger(tracks, sink.clone());
    let adapter = MockStoreAdapter::default();

    let (track, _) = ledger
        .create_or_update_track(UserId::new(1), &store, &adapter, request("100", "1", "55"))
        .await
        .unwrap();

    let cancel = TrackUpdate {
        source_status: SourceStatus::from("cancel_order_close_trade"),
        tracking_number: None,
        data: serde_json::Value::Null,
    };
    ledger
        .update_status(UserId::new(1), &store, track.id, cancel.clone())
        .await
        .unwrap();
    ledger
        .update_status(UserId::new(1), &store, track.id, cancel)
        .await
        .unwrap();

    let alerts = sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    let OrderAlert::SupplierOrderCancelled {
        source_id,
        order_id,
        ..
    } = &alerts[0];
    assert_eq!(*source_id, SourceId::new("55"));
    assert_eq!(*order_id, OrderId::new("100"));
}
