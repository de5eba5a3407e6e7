//! The order-track ledger.
//!
//! One track row records the supplier order placed for one store order line,
//! uniquely scoped by (store, order, line). The ledger is the only mutable
//! state touched from multiple concurrent request paths (manual fulfillment,
//! price-monitor webhooks, bulk sync), so every mutation re-reads then
//! writes inside the per-(store, order) lock from [`OrderCache`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dropkit_core::{
    LineId, OrderId, SourceId, SourceStatus, StoreId, SupplierType, TrackId, UserId,
};
use tracing::{info, instrument, warn};

use crate::adapters::StoreAdapter;
use crate::cache::OrderCache;
use crate::db::RepositoryError;
use crate::error::OrderFlowError;
use crate::models::{NewTrack, OrderTrack, Store};
use crate::notify::{NotificationSink, OrderAlert, notify};
use crate::permissions::{PermissionOracle, Resource, ensure_delete, ensure_edit};

// =============================================================================
// Persistence seam
// =============================================================================

/// Persistence operations the ledger needs.
///
/// The production implementation is [`crate::db::tracks::PgTrackStore`];
/// tests substitute an in-memory map.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// All tracks for one (store, order, line), oldest first.
    async fn find(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Result<Vec<OrderTrack>, RepositoryError>;

    /// All tracks in the store carrying this supplier order id.
    async fn find_by_source(
        &self,
        store: StoreId,
        source: &SourceId,
    ) -> Result<Vec<OrderTrack>, RepositoryError>;

    /// All tracks for one order, oldest first.
    async fn find_for_order(
        &self,
        store: StoreId,
        order: &OrderId,
    ) -> Result<Vec<OrderTrack>, RepositoryError>;

    /// One track by id.
    async fn get(&self, id: TrackId) -> Result<Option<OrderTrack>, RepositoryError>;

    /// Insert a fresh track.
    async fn insert(&self, track: NewTrack) -> Result<OrderTrack, RepositoryError>;

    /// Persist a modified track.
    async fn update(&self, track: &OrderTrack) -> Result<(), RepositoryError>;

    /// Delete a track row.
    async fn delete(&self, id: TrackId) -> Result<(), RepositoryError>;

    /// Delete locally cached order-item rows keyed by the track.
    async fn delete_order_items(&self, track: TrackId) -> Result<u64, RepositoryError>;
}

// =============================================================================
// Ledger
// =============================================================================

/// A request to attach a supplier order id to a store order line.
#[derive(Debug, Clone)]
pub struct TrackRequest {
    /// Platform order id.
    pub order_id: OrderId,
    /// Platform line id.
    pub line_id: LineId,
    /// Supplier order id to attach.
    pub source_id: SourceId,
    /// Sourcing platform the order was placed on.
    pub source_type: SupplierType,
    /// Override ledger conflicts (duplicate id on the line, id reused
    /// across orders).
    pub forced: bool,
}

/// A supplier-reported status/tracking update for one track.
#[derive(Debug, Clone)]
pub struct TrackUpdate {
    /// New supplier order status.
    pub source_status: SourceStatus,
    /// Carrier tracking number, when known.
    pub tracking_number: Option<String>,
    /// Raw supplier order detail.
    pub data: serde_json::Value,
}

/// The order-track ledger. Cheap to clone.
#[derive(Clone)]
pub struct TrackLedger {
    tracks: Arc<dyn TrackStore>,
    permissions: Arc<dyn PermissionOracle>,
    notifications: Arc<dyn NotificationSink>,
    cache: OrderCache,
}

impl TrackLedger {
    /// Assemble the ledger from its collaborators.
    #[must_use]
    pub fn new(
        tracks: Arc<dyn TrackStore>,
        permissions: Arc<dyn PermissionOracle>,
        notifications: Arc<dyn NotificationSink>,
        cache: OrderCache,
    ) -> Self {
        Self {
            tracks,
            permissions,
            notifications,
            cache,
        }
    }

    /// Direct access to the persistence seam (reconciler, sync).
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TrackStore> {
        &self.tracks
    }

    /// Attach a supplier order id to an order line.
    ///
    /// Runs as one critical section per (store, order): collapse duplicate
    /// rows for the line down to the oldest, validate the new id against the
    /// surviving row and against other orders in the store, upsert, then
    /// append a note to the platform order. Returns the track and whether it
    /// was freshly created.
    ///
    /// # Errors
    ///
    /// [`OrderFlowError::DuplicateSupplierOrder`] when the line already
    /// carries a different supplier order id, and
    /// [`OrderFlowError::SupplierOrderReuse`] when the id is attached to
    /// another order in the store; both are bypassed by `forced`. Also
    /// permission, repository, and upstream note-write failures.
    #[instrument(
        skip(self, store, adapter, request),
        fields(
            store_id = %store.id,
            order_id = %request.order_id,
            line_id = %request.line_id,
            source_id = %request.source_id,
        )
    )]
    pub async fn create_or_update_track(
        &self,
        user: UserId,
        store: &Store,
        adapter: &dyn StoreAdapter,
        request: TrackRequest,
    ) -> Result<(OrderTrack, bool), OrderFlowError> {
        ensure_edit(self.permissions.as_ref(), user, Resource::Store(store.id)).await?;

        let lock = self.cache.order_lock(store.id, &request.order_id).await;
        let _guard = lock.lock().await;

        let survivor = self
            .collapse_duplicates(store.id, &request.order_id, &request.line_id)
            .await?;

        if let Some(existing) = &survivor
            && let Some(attached) = &existing.source_id
            && *attached != request.source_id
            && !request.forced
        {
            return Err(OrderFlowError::DuplicateSupplierOrder {
                order_id: request.order_id,
                line_id: request.line_id,
            });
        }

        if !request.forced
            && let Some(other) = self
                .tracks
                .find_by_source(store.id, &request.source_id)
                .await?
                .into_iter()
                .find(|t| t.order_id != request.order_id)
        {
            return Err(OrderFlowError::SupplierOrderReuse {
                source_id: request.source_id,
                other_order: other.order_id,
            });
        }

        let (track, created) = match survivor {
            Some(mut track) => {
                track.source_id = Some(request.source_id.clone());
                track.source_type = request.source_type;
                track.updated_at = Utc::now();
                self.tracks.update(&track).await?;
                (track, false)
            }
            None => {
                let track = self
                    .tracks
                    .insert(NewTrack {
                        store_id: store.id,
                        order_id: request.order_id.clone(),
                        line_id: request.line_id.clone(),
                        source_id: Some(request.source_id.clone()),
                        source_type: request.source_type,
                    })
                    .await?;
                (track, true)
            }
        };

        self.append_order_note(adapter, &request).await?;

        info!(track_id = %track.id, created, "Supplier order attached");
        Ok((track, created))
    }

    /// Apply a supplier-reported status update to a track.
    ///
    /// A transition into a cancelled/refunded status fires a cancellation
    /// alert through the notification sink; delivery failure is logged and
    /// never fails the update.
    ///
    /// # Errors
    ///
    /// [`OrderFlowError::NotFound`] when the track does not exist in the
    /// store, plus permission and repository failures.
    #[instrument(skip(self, store, update), fields(store_id = %store.id, track_id = %track_id))]
    pub async fn update_status(
        &self,
        user: UserId,
        store: &Store,
        track_id: TrackId,
        update: TrackUpdate,
    ) -> Result<OrderTrack, OrderFlowError> {
        ensure_edit(self.permissions.as_ref(), user, Resource::Track(track_id)).await?;

        let mut track = self
            .tracks
            .get(track_id)
            .await?
            .filter(|t| t.store_id == store.id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("order track {track_id}")))?;

        let lock = self.cache.order_lock(store.id, &track.order_id).await;
        let _guard = lock.lock().await;

        let was_cancelled = track.source_status.is_cancelled();
        let now = Utc::now();
        if track.source_status != update.source_status {
            track.status_updated_at = now;
        }
        track.source_status = update.source_status;
        if update.tracking_number.is_some() {
            track.tracking_number = update.tracking_number;
        }
        if !update.data.is_null() {
            track.data = update.data;
        }
        track.updated_at = now;
        self.tracks.update(&track).await?;

        if !was_cancelled
            && track.source_status.is_cancelled()
            && let Some(source_id) = &track.source_id
        {
            notify(
                self.notifications.as_ref(),
                OrderAlert::SupplierOrderCancelled {
                    user_id: store.user_id,
                    store_id: store.id,
                    order_id: track.order_id.clone(),
                    source_id: source_id.clone(),
                    status: track.source_status.clone(),
                },
            )
            .await;
        }

        Ok(track)
    }

    /// Delete a track, cascading its cached order-item rows.
    ///
    /// # Errors
    ///
    /// [`OrderFlowError::NotFound`] when the track does not exist, plus
    /// permission and repository failures.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn delete_track(&self, user: UserId, track_id: TrackId) -> Result<(), OrderFlowError> {
        ensure_delete(self.permissions.as_ref(), user, Resource::Track(track_id)).await?;

        let track = self
            .tracks
            .get(track_id)
            .await?
            .ok_or_else(|| OrderFlowError::NotFound(format!("order track {track_id}")))?;

        let lock = self.cache.order_lock(track.store_id, &track.order_id).await;
        let _guard = lock.lock().await;

        let items = self.tracks.delete_order_items(track_id).await?;
        self.tracks.delete(track_id).await?;
        info!(cascaded_items = items, "Order track deleted");
        Ok(())
    }

    /// Set the hidden flag on a track (user dismissed it from the view).
    ///
    /// # Errors
    ///
    /// [`OrderFlowError::NotFound`] when the track does not exist, plus
    /// permission and repository failures.
    pub async fn set_hidden(
        &self,
        user: UserId,
        track_id: TrackId,
        hidden: bool,
    ) -> Result<(), OrderFlowError> {
        ensure_edit(self.permissions.as_ref(), user, Resource::Track(track_id)).await?;
        let mut track = self
            .tracks
            .get(track_id)
            .await?
            .ok_or_else(|| OrderFlowError::NotFound(format!("order track {track_id}")))?;
        track.hidden = hidden;
        track.updated_at = Utc::now();
        self.tracks.update(&track).await?;
        Ok(())
    }

    /// Reduce the line's tracks to a single oldest survivor.
    ///
    /// Duplicates are a known race repair, not a normal path; discarded rows
    /// are logged before deletion so the repair leaves a trace.
    async fn collapse_duplicates(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Result<Option<OrderTrack>, OrderFlowError> {
        let mut tracks = self.tracks.find(store, order, line).await?;
        if tracks.is_empty() {
            return Ok(None);
        }
        let survivor = tracks.remove(0);
        for extra in tracks {
            warn!(
                track_id = %extra.id,
                source_id = ?extra.source_id,
                source_status = %extra.source_status,
                "Discarding duplicate order track"
            );
            self.tracks.delete_order_items(extra.id).await?;
            self.tracks.delete(extra.id).await?;
        }
        Ok(Some(survivor))
    }

    /// Append the supplier-order note to the platform order, idempotently.
    ///
    /// Reads the latest note, skips the write when the line is already
    /// present, otherwise writes the combined text back. Safe under
    /// at-least-once task delivery.
    async fn append_order_note(
        &self,
        adapter: &dyn StoreAdapter,
        request: &TrackRequest,
    ) -> Result<(), OrderFlowError> {
        let label = match request.source_type {
            SupplierType::Aliexpress => "AliExpress",
            SupplierType::Ebay => "eBay",
            SupplierType::Other => "Supplier",
        };
        let note_line = format!(
            "{label} order ID: {} (line {})",
            request.source_id, request.line_id
        );

        let current = adapter.get_order_note(&request.order_id).await?;
        if current.as_deref().is_some_and(|n| n.contains(&note_line)) {
            return Ok(());
        }
        let combined = match current {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note_line}"),
            _ => note_line,
        };
        adapter
            .set_order_note(&request.order_id, &combined)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{OrderFilters, OrderPage, Shipment};
    use crate::config::OrdersConfig;
    use crate::error::UpstreamApiError;
    use dropkit_core::{FulfillmentStatus, Platform};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    // In-memory double for the persistence seam.
    #[derive(Default)]
    struct MemTracks {
        rows: Mutex<HashMap<TrackId, OrderTrack>>,
        next_id: AtomicI64,
    }

    #[async_trait]
    impl TrackStore for MemTracks {
        async fn find(
            &self,
            store: StoreId,
            order: &OrderId,
            line: &LineId,
        ) -> Result<Vec<OrderTrack>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            let mut found: Vec<_> = rows
                .values()
                .filter(|t| t.store_id == store && &t.order_id == order && &t.line_id == line)
                .cloned()
                .collect();
            found.sort_by_key(|t| t.id);
            Ok(found)
        }

        async fn find_by_source(
            &self,
            store: StoreId,
            source: &SourceId,
        ) -> Result<Vec<OrderTrack>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .filter(|t| t.store_id == store && t.source_id.as_ref() == Some(source))
                .cloned()
                .collect())
        }

        async fn find_for_order(
            &self,
            store: StoreId,
            order: &OrderId,
        ) -> Result<Vec<OrderTrack>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            let mut found: Vec<_> = rows
                .values()
                .filter(|t| t.store_id == store && &t.order_id == order)
                .cloned()
                .collect();
            found.sort_by_key(|t| t.id);
            Ok(found)
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

    // Adapter double recording only note traffic.
    #[derive(Default)]
    struct NoteAdapter {
        note: Mutex<Option<String>>,
        writes: AtomicI64,
    }

    #[async_trait]
    impl StoreAdapter for NoteAdapter {
        fn platform(&self) -> Platform {
            Platform::Shopify
        }

        async fn list_orders(
            &self,
            _filters: &OrderFilters,
            _page: u32,
            _per_page: u32,
        ) -> Result<OrderPage, UpstreamApiError> {
            Ok(OrderPage::default())
        }

        async fn get_order_shipments(
            &self,
            _order_id: &OrderId,
        ) -> Result<Vec<Shipment>, UpstreamApiError> {
            Ok(vec![])
        }

        async fn update_order_status(
            &self,
            _order_id: &OrderId,
            _payload: &serde_json::Value,
        ) -> Result<(), UpstreamApiError> {
            Ok(())
        }

        async fn get_order_note(
            &self,
            _order_id: &OrderId,
        ) -> Result<Option<String>, UpstreamApiError> {
            Ok(self.note.lock().unwrap().clone())
        }

        async fn set_order_note(
            &self,
            _order_id: &OrderId,
            note: &str,
        ) -> Result<(), UpstreamApiError> {
            *self.note.lock().unwrap() = Some(note.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
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

    fn ledger(tracks: Arc<MemTracks>) -> TrackLedger {
        TrackLedger::new(
            tracks,
            Arc::new(AllowAll),
            Arc::new(crate::notify::NullSink),
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
    async fn test_create_then_repeat_converges_to_one_row() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks.clone());
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        let (_, created) = ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();
        assert!(created);

        let (_, created) = ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();
        assert!(!created);

        let rows = tracks
            .find(store.id, &OrderId::new("100"), &LineId::new("1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_id, Some(SourceId::new("8001")));
    }

    #[tokio::test]
    async fn test_duplicate_rows_collapse_to_oldest() {
        let tracks = Arc::new(MemTracks::default());
        // Seed the race directly: two rows for the same line.
        for _ in 0..2 {
            tracks
                .insert(NewTrack {
                    store_id: StoreId::new(1),
                    order_id: OrderId::new("100"),
                    line_id: LineId::new("1"),
                    source_id: None,
                    source_type: SupplierType::Aliexpress,
                })
                .await
                .unwrap();
        }
        let ledger = ledger(tracks.clone());
        let store = test_store();
        let adapter = NoteAdapter::default();

        let (track, created) = ledger
            .create_or_update_track(UserId::new(1), &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(track.id, TrackId::new(1));

        let rows = tracks
            .find(store.id, &OrderId::new("100"), &LineId::new("1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_source_id_rejected_unless_forced() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks.clone());
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();

        let err = ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "9002"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderFlowError::DuplicateSupplierOrder { .. }));

        let mut forced = request("100", "1", "9002");
        forced.forced = true;
        let (track, _) = ledger
            .create_or_update_track(user, &store, &adapter, forced)
            .await
            .unwrap();
        assert_eq!(track.source_id, Some(SourceId::new("9002")));
    }

    #[tokio::test]
    async fn test_source_reuse_across_orders_rejected_unless_forced() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks.clone());
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();

        let err = ledger
            .create_or_update_track(user, &store, &adapter, request("200", "1", "8001"))
            .await
            .unwrap_err();
        match err {
            OrderFlowError::SupplierOrderReuse { other_order, .. } => {
                assert_eq!(other_order, OrderId::new("100"));
            }
            other => panic!("expected reuse error, got {other:?}"),
        }

        let mut forced = request("200", "1", "8001");
        forced.forced = true;
        ledger
            .create_or_update_track(user, &store, &adapter, forced)
            .await
            .unwrap();

        let bound = tracks
            .find_by_source(store.id, &SourceId::new("8001"))
            .await
            .unwrap();
        assert_eq!(bound.len(), 2);
    }

    #[tokio::test]
    async fn test_note_append_is_idempotent() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks);
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        for _ in 0..3 {
            ledger
                .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
                .await
                .unwrap();
        }

        assert_eq!(adapter.writes.load(Ordering::SeqCst), 1);
        let note = adapter.note.lock().unwrap().clone().unwrap();
        assert_eq!(note.matches("8001").count(), 1);
    }

    #[tokio::test]
    async fn test_note_appends_below_existing_text() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks);
        let store = test_store();
        let adapter = NoteAdapter::default();
        *adapter.note.lock().unwrap() = Some("Gift wrap please".to_string());

        ledger
            .create_or_update_track(
                UserId::new(1),
                &store,
                &adapter,
                request("100", "1", "8001"),
            )
            .await
            .unwrap();

        let note = adapter.note.lock().unwrap().clone().unwrap();
        assert!(note.starts_with("Gift wrap please\n"));
        assert!(note.contains("AliExpress order ID: 8001"));
    }

    #[tokio::test]
    async fn test_cancellation_transition_fires_alert_once() {
        struct CountingSink(AtomicI64);

        #[async_trait]
        impl NotificationSink for CountingSink {
            async fn send(
                &self,
                _alert: OrderAlert,
            ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let tracks = Arc::new(MemTracks::default());
        let sink = Arc::new(CountingSink(AtomicI64::new(0)));
        let ledger = TrackLedger::new(
            tracks.clone(),
            Arc::new(AllowAll),
            sink.clone(),
            OrderCache::new(&OrdersConfig::default()),
        );
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        let (track, _) = ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();

        let update = |status: &str| TrackUpdate {
            source_status: SourceStatus::from(status),
            tracking_number: None,
            data: serde_json::Value::Null,
        };

        ledger
            .update_status(user, &store, track.id, update("WAIT_SELLER_SEND_GOODS"))
            .await
            .unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);

        ledger
            .update_status(user, &store, track.id, update("cancel_order_close_trade"))
            .await
            .unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);

        // Second update while already cancelled must not re-alert.
        ledger
            .update_status(user, &store, track.id, update("buyer_cancel_order_in_risk"))
            .await
            .unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_change_bumps_status_timestamp() {
        let tracks = Arc::new(MemTracks::default());
        let ledger = ledger(tracks);
        let store = test_store();
        let adapter = NoteAdapter::default();
        let user = UserId::new(1);

        let (track, _) = ledger
            .create_or_update_track(user, &store, &adapter, request("100", "1", "8001"))
            .await
            .unwrap();
        let before = track.status_updated_at;

        let updated = ledger
            .update_status(
                user,
                &store,
                track.id,
                TrackUpdate {
                    source_status: SourceStatus::from("PLACE_ORDER_SUCCESS"),
                    tracking_number: Some("LX123456789CN".into()),
                    data: serde_json::json!({"carrier": "cainiao"}),
                },
            )
            .await
            .unwrap();
        assert!(updated.status_updated_at >= before);
        assert_eq!(updated.tracking_number.as_deref(), Some("LX123456789CN"));
    }

    #[tokio::test]
    async fn test_delete_missing_track_is_not_found() {
        let ledger = ledger(Arc::new(MemTracks::default()));
        let err = ledger
            .delete_track(UserId::new(1), TrackId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderFlowError::NotFound(_)));
    }
}
