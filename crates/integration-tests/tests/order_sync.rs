//! Orchestrator behavior across the three order sources: selection policy,
//! background mirror refresh on staleness, and refresh cancellation.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use dropkit_integration_tests::{
    FixedSearchIndex, InMemoryMirror, MockStoreAdapter, paid_order, test_store,
};
use dropkit_orders::adapters::OrderFilters;
use dropkit_orders::cache::OrderCache;
use dropkit_orders::config::OrdersConfig;
use dropkit_orders::sync::{OrderSource, OrderSyncOrchestrator, SearchIndex, SyncSettings};
use dropkit_orders::tasks::TaskDispatcher;

fn orchestrator(
    adapter: MockStoreAdapter,
    search: Option<Arc<dyn SearchIndex>>,
    mirror: Arc<InMemoryMirror>,
) -> OrderSyncOrchestrator {
    OrderSyncOrchestrator::new(
        Arc::new(adapter),
        search,
        mirror,
        OrderCache::new(&OrdersConfig::default()),
        TaskDispatcher::default(),
    )
}

#[tokio::test]
async fn test_each_source_serves_its_own_page() {
    let adapter = MockStoreAdapter::with_orders(vec![paid_order("1")]);
    let search = Arc::new(FixedSearchIndex {
        orders: vec![paid_order("2"), paid_order("3")],
    });
    let mirror = Arc::new(InMemoryMirror::default());
    mirror.seed(paid_order("4"));
    mirror.seed(paid_order("5"));
    mirror.seed(paid_order("6"));
    let sync = orchestrator(adapter, Some(search), mirror);
    let store = test_store();
    let filters = OrderFilters::default();

    let (page, source) = sync
        .fetch_page(
            &store,
            SyncSettings {
                sync_enabled: true,
                ..Default::default()
            },
            &filters,
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(source, OrderSource::DatabaseMirror);
    assert_eq!(page.total_count, 3);

    let (page, source) = sync
        .fetch_page(
            &store,
            SyncSettings {
                sync_enabled: true,
                search_index_enabled: true,
                ..Default::default()
            },
            &filters,
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(source, OrderSource::SearchIndex);
    assert_eq!(page.total_count, 2);

    let (page, source) = sync
        .fetch_page(
            &store,
            SyncSettings {
                sync_enabled: true,
                live_override: true,
                ..Default::default()
            },
            &filters,
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(source, OrderSource::DirectApi);
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn test_missing_search_index_falls_back() {
    let sync = orchestrator(
        MockStoreAdapter::with_orders(vec![paid_order("1")]),
        None,
        Arc::new(InMemoryMirror::default()),
    );
    let settings = SyncSettings {
        search_index_enabled: true,
        ..Default::default()
    };

    let (_, source) = sync
        .fetch_page(&test_store(), settings, &OrderFilters::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(source, OrderSource::DirectApi);
}

#[tokio::test]
async fn test_stale_order_triggers_background_mirror_refresh() {
    let mut fresh = paid_order("1");
    fresh.updated_at = Utc::now();
    let mut stale_copy = fresh.clone();
    stale_copy.updated_at = Utc::now() - chrono::Duration::hours(2);

    let mirror = Arc::new(InMemoryMirror::default());
    mirror.seed(stale_copy);
    let sync = orchestrator(
        MockStoreAdapter::with_orders(vec![fresh]),
        None,
        mirror.clone(),
    );

    let (_, source) = sync
        .fetch_page(
            &test_store(),
            SyncSettings {
                sync_enabled: true,
                live_override: true,
                ..Default::default()
            },
            &OrderFilters::default(),
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(source, OrderSource::DirectApi);

    // The refresh runs detached; poll until it lands.
    for _ in 0..100 {
        if mirror.upserts.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(mirror.upserts.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_fresh_mirror_schedules_no_refresh() {
    let order = paid_order("1");
    let mirror = Arc::new(InMemoryMirror::default());
    mirror.seed(order.clone());
    let sync = orchestrator(MockStoreAdapter::with_orders(vec![order]), None, mirror.clone());

    sync.fetch_page(
        &test_store(),
        SyncSettings {
            sync_enabled: true,
            live_override: true,
            ..Default::default()
        },
        &OrderFilters::default(),
        1,
        20,
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mirror.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_without_running_refresh_reports_false() {
    let sync = orchestrator(
        MockStoreAdapter::default(),
        None,
        Arc::new(InMemoryMirror::default()),
    );
    assert!(!sync.cancel_sync(test_store().id).await);
}
