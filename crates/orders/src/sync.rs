//! Order listing orchestration across three data sources.
//!
//! Each request is served from exactly one source: the platform API
//! (always fresh, narrow filtering), a search-index mirror (rich filtering,
//! eventually consistent), or the local database mirror (full filtering,
//! periodically synced). Whichever source served the page, any order whose
//! platform `updated_at` is newer than the mirrored copy schedules a
//! fire-and-forget mirror refresh; the request itself never blocks on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{OrderId, StoreId};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{OrderFilters, OrderPage, RawOrder, StoreAdapter};
use crate::cache::OrderCache;
use crate::db::RepositoryError;
use crate::error::{OrderFlowError, UpstreamApiError};
use crate::models::Store;
use crate::tasks::TaskDispatcher;

// =============================================================================
// Source selection
// =============================================================================

/// The data source a listing request is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// Platform API. Always fresh; single fulfillment/financial filter
    /// value only.
    DirectApi,
    /// Search-index mirror. Rich boolean filtering, eventually consistent.
    SearchIndex,
    /// Local relational mirror. Full filtering, periodically synced.
    DatabaseMirror,
}

/// Per-store sync configuration driving source selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncSettings {
    /// Store-level order sync is enabled.
    pub sync_enabled: bool,
    /// User requested live data for this request, bypassing the mirror.
    pub live_override: bool,
    /// A search-index mirror is available and enabled for the store.
    pub search_index_enabled: bool,
}

/// Pick the source for one request.
#[must_use]
pub const fn select_source(settings: SyncSettings) -> OrderSource {
    if settings.sync_enabled && !settings.live_override && !settings.search_index_enabled {
        OrderSource::DatabaseMirror
    } else if settings.search_index_enabled {
        OrderSource::SearchIndex
    } else {
        OrderSource::DirectApi
    }
}

// =============================================================================
// Mirror seams
// =============================================================================

/// Search-index mirror of a store's orders.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Query one page with full boolean filtering.
    async fn search_orders(
        &self,
        store: StoreId,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError>;
}

/// Local relational mirror of a store's orders.
#[async_trait]
pub trait OrderMirror: Send + Sync {
    /// Query one page with full filtering.
    async fn query_orders(
        &self,
        store: StoreId,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError>;

    /// Platform `updated_at` of the mirrored copy, `None` when never synced.
    async fn synced_updated_at(
        &self,
        store: StoreId,
        order: &OrderId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError>;

    /// Write one order into the mirror.
    async fn upsert_order(&self, store: StoreId, order: &RawOrder) -> Result<(), RepositoryError>;
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Serves order pages and keeps the mirror converging in the background.
#[derive(Clone)]
pub struct OrderSyncOrchestrator {
    adapter: Arc<dyn StoreAdapter>,
    search: Option<Arc<dyn SearchIndex>>,
    mirror: Arc<dyn OrderMirror>,
    cache: OrderCache,
    tasks: TaskDispatcher,
    refresh_tasks: Arc<Mutex<HashMap<StoreId, Uuid>>>,
}

impl OrderSyncOrchestrator {
    /// Assemble the orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn StoreAdapter>,
        search: Option<Arc<dyn SearchIndex>>,
        mirror: Arc<dyn OrderMirror>,
        cache: OrderCache,
        tasks: TaskDispatcher,
    ) -> Self {
        Self {
            adapter,
            search,
            mirror,
            cache,
            tasks,
            refresh_tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch one page of orders from the selected source.
    ///
    /// Returns the page and the source that served it. Stale orders on the
    /// page schedule an asynchronous mirror refresh, deduplicated by the
    /// per-store sync lease.
    ///
    /// # Errors
    ///
    /// Upstream/repository failures from whichever source served the page,
    /// converted into [`OrderFlowError`].
    #[instrument(skip(self, store, filters), fields(store_id = %store.id, page))]
    pub async fn fetch_page(
        &self,
        store: &Store,
        settings: SyncSettings,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<(OrderPage, OrderSource), OrderFlowError> {
        let settings = SyncSettings {
            search_index_enabled: settings.search_index_enabled && self.search.is_some(),
            ..settings
        };
        let source = select_source(settings);

        let result = match source {
            OrderSource::DirectApi => self
                .adapter
                .list_orders(&filters.simplified_for_api(), page, per_page)
                .await?,
            OrderSource::SearchIndex => {
                // Guarded by the is_some() check above.
                let Some(search) = &self.search else {
                    return Err(OrderFlowError::NotFound("search index".to_string()));
                };
                search
                    .search_orders(store.id, filters, page, per_page)
                    .await?
            }
            OrderSource::DatabaseMirror => self
                .mirror
                .query_orders(store.id, filters, page, per_page)
                .await
                .map_err(OrderFlowError::Repository)?,
        };

        debug!(?source, orders = result.orders.len(), "Order page served");
        self.schedule_refresh_if_stale(store.id, &result.orders).await;
        Ok((result, source))
    }

    /// Cancel the in-flight mirror refresh for a store, releasing the lease.
    ///
    /// Returns whether a refresh was actually running.
    pub async fn cancel_sync(&self, store: StoreId) -> bool {
        let task = self
            .refresh_tasks
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&store));
        let Some(task) = task else {
            return false;
        };
        let cancelled = self.tasks.cancel(task);
        self.cache.end_sync(store).await;
        info!(store_id = %store, cancelled, "Mirror refresh stopped");
        cancelled
    }

    /// Compare page orders against the mirror and schedule one refresh task
    /// covering the stale ones. Never blocks the request on the refresh.
    async fn schedule_refresh_if_stale(&self, store: StoreId, orders: &[RawOrder]) {
        let mut stale = Vec::new();
        for order in orders {
            let synced = match self.mirror.synced_updated_at(store, &order.id).await {
                Ok(synced) => synced,
                Err(error) => {
                    warn!(%error, order_id = %order.id, "Mirror staleness check failed");
                    continue;
                }
            };
            if synced.is_none_or(|at| order.updated_at > at) {
                stale.push(order.clone());
            }
        }
        if stale.is_empty() {
            return;
        }
        if !self.cache.try_begin_sync(store).await {
            debug!(store_id = %store, "Mirror refresh already in flight");
            return;
        }

        info!(store_id = %store, stale = stale.len(), "Scheduling mirror refresh");
        let mirror = Arc::clone(&self.mirror);
        let cache = self.cache.clone();
        let refresh_tasks = Arc::clone(&self.refresh_tasks);
        let task = self.tasks.spawn(async move {
            for order in &stale {
                if let Err(error) = mirror.upsert_order(store, order).await {
                    warn!(%error, order_id = %order.id, "Mirror upsert failed");
                }
            }
            cache.end_sync(store).await;
            if let Ok(mut tasks) = refresh_tasks.lock() {
                tasks.remove(&store);
            }
        });
        if let Ok(mut tasks) = self.refresh_tasks.lock() {
            tasks.insert(store, task);
        }
    }
}
