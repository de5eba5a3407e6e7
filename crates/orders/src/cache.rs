//! Keyed cache for placement records, sync leases, and per-order locks.
//!
//! Every cached item is addressed by a structured [`CacheKey`] variant
//! instead of an ad hoc string template, so two call sites can never collide
//! on a typo'd key. The cache is not durable: losing it only degrades UX
//! (the user re-triggers "place order"), never the track ledger.
//!
//! Caches placement records and sync flags using `moka` with a per-purpose
//! TTL, and hands out per-(store, order) async locks whose cache expiry acts
//! as the lock lease.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dropkit_core::{LineId, OrderId, StoreId};
use moka::Expiry;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::config::OrdersConfig;
use crate::lines::PlacementRecord;

/// Structured cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// A computed order placement record, the contract handed to the
    /// place-order redirect flow.
    PlacementRecord {
        store: StoreId,
        order: OrderId,
        line: LineId,
    },
    /// Per-store lease preventing redundant concurrent background syncs.
    SyncInProgress { store: StoreId },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A placement record.
    Placement(Box<PlacementRecord>),
    /// Presence-only flag.
    Flag,
}

/// Per-purpose TTL policy.
struct PurposeExpiry {
    placement_ttl: Duration,
    sync_flag_ttl: Duration,
}

impl Expiry<CacheKey, CacheValue> for PurposeExpiry {
    fn expire_after_create(
        &self,
        key: &CacheKey,
        _value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        match key {
            CacheKey::PlacementRecord { .. } => Some(self.placement_ttl),
            CacheKey::SyncInProgress { .. } => Some(self.sync_flag_ttl),
        }
    }
}

/// Shared cache for the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct OrderCache {
    entries: Cache<CacheKey, CacheValue>,
    locks: Cache<(StoreId, OrderId), Arc<Mutex<()>>>,
}

impl OrderCache {
    /// Create a cache with the configured TTLs.
    #[must_use]
    pub fn new(config: &OrdersConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(100_000)
            .expire_after(PurposeExpiry {
                placement_ttl: config.placement_ttl,
                sync_flag_ttl: config.sync_flag_ttl,
            })
            .build();
        // The lock entry's TTL is the lease: a crashed holder stops blocking
        // others once the entry expires.
        let locks = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.order_lock_ttl)
            .build();
        Self { entries, locks }
    }

    /// Write (or rewrite) a placement record under its synthetic key.
    ///
    /// Only the line that produced a record rewrites it, so placement
    /// records are effectively single-writer per key.
    pub async fn put_placement(&self, store: StoreId, record: PlacementRecord) {
        let key = CacheKey::PlacementRecord {
            store,
            order: record.order_id.clone(),
            line: record.line_id.clone(),
        };
        self.entries
            .insert(key, CacheValue::Placement(Box::new(record)))
            .await;
    }

    /// Read a placement record back, if it has not expired.
    pub async fn get_placement(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Option<PlacementRecord> {
        let key = CacheKey::PlacementRecord {
            store,
            order: order.clone(),
            line: line.clone(),
        };
        match self.entries.get(&key).await {
            Some(CacheValue::Placement(record)) => Some(*record),
            _ => None,
        }
    }

    /// Drop a placement record (after the supplier order was placed).
    pub async fn invalidate_placement(&self, store: StoreId, order: &OrderId, line: &LineId) {
        let key = CacheKey::PlacementRecord {
            store,
            order: order.clone(),
            line: line.clone(),
        };
        self.entries.invalidate(&key).await;
    }

    /// Try to take the per-store sync lease.
    ///
    /// Returns `false` when a sync is already in flight for the store.
    pub async fn try_begin_sync(&self, store: StoreId) -> bool {
        let key = CacheKey::SyncInProgress { store };
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, CacheValue::Flag).await;
        true
    }

    /// Whether a sync lease is currently held for the store.
    pub async fn sync_in_progress(&self, store: StoreId) -> bool {
        self.entries
            .contains_key(&CacheKey::SyncInProgress { store })
    }

    /// Release the sync lease (normal task completion; expiry covers the
    /// crashed case).
    pub async fn end_sync(&self, store: StoreId) {
        self.entries
            .invalidate(&CacheKey::SyncInProgress { store })
            .await;
    }

    /// Async lock scoped to one (store, order).
    ///
    /// The ledger's collapse-then-validate sequence and the note append both
    /// run inside this lock so two concurrent fulfillment requests cannot
    /// interleave their writes.
    pub async fn order_lock(&self, store: StoreId, order: &OrderId) -> Arc<Mutex<()>> {
        self.locks
            .get_with((store, order.clone()), async { Arc::new(Mutex::new(())) })
            .await
    }
}
