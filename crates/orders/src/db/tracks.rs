//! Order-track ledger persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{
    FulfillmentStatus, LineId, OrderId, SourceId, SourceStatus, StoreId, SupplierType, TrackId,
};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{NewTrack, OrderTrack};
use crate::tracks::TrackStore;

/// Postgres-backed [`TrackStore`].
#[derive(Clone)]
pub struct PgTrackStore {
    pool: PgPool,
}

impl PgTrackStore {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TrackRow {
    id: i64,
    store_id: i64,
    order_id: String,
    line_id: String,
    source_id: Option<String>,
    source_type: String,
    source_status: String,
    store_status: String,
    tracking_number: Option<String>,
    hidden: bool,
    seen: bool,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    status_updated_at: DateTime<Utc>,
}

impl From<TrackRow> for OrderTrack {
    fn from(row: TrackRow) -> Self {
        Self {
            id: TrackId::new(row.id),
            store_id: StoreId::new(row.store_id),
            order_id: OrderId::new(row.order_id),
            line_id: LineId::new(row.line_id),
            source_id: row.source_id.map(SourceId::new),
            source_type: SupplierType::from_source(&row.source_type),
            source_status: SourceStatus::new(row.source_status),
            store_status: FulfillmentStatus::parse(&row.store_status),
            tracking_number: row.tracking_number,
            hidden: row.hidden,
            seen: row.seen,
            data: row.data,
            created_at: row.created_at,
            updated_at: row.updated_at,
            status_updated_at: row.status_updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, store_id, order_id, line_id, source_id, source_type, \
     source_status, store_status, tracking_number, hidden, seen, data, \
     created_at, updated_at, status_updated_at";

#[async_trait]
impl TrackStore for PgTrackStore {
    async fn find(
        &self,
        store: StoreId,
        order: &OrderId,
        line: &LineId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM order_tracks \
             WHERE store_id = $1 AND order_id = $2 AND line_id = $3 \
             ORDER BY id"
        ))
        .bind(store.as_i64())
        .bind(order.as_str())
        .bind(line.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderTrack::from).collect())
    }

    async fn find_by_source(
        &self,
        store: StoreId,
        source: &SourceId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM order_tracks \
             WHERE store_id = $1 AND source_id = $2 \
             ORDER BY id"
        ))
        .bind(store.as_i64())
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderTrack::from).collect())
    }

    async fn find_for_order(
        &self,
        store: StoreId,
        order: &OrderId,
    ) -> Result<Vec<OrderTrack>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM order_tracks \
             WHERE store_id = $1 AND order_id = $2 \
             ORDER BY id"
        ))
        .bind(store.as_i64())
        .bind(order.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderTrack::from).collect())
    }

    async fn get(&self, id: TrackId) -> Result<Option<OrderTrack>, RepositoryError> {
        let row = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM order_tracks WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OrderTrack::from))
    }

    async fn insert(&self, track: NewTrack) -> Result<OrderTrack, RepositoryError> {
        let row = sqlx::query_as::<_, TrackRow>(&format!(
            "INSERT INTO order_tracks \
             (store_id, order_id, line_id, source_id, source_type, \
              source_status, store_status, data) \
             VALUES ($1, $2, $3, $4, $5, '', $6, 'null'::jsonb) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(track.store_id.as_i64())
        .bind(track.order_id.as_str())
        .bind(track.line_id.as_str())
        .bind(track.source_id.as_ref().map(SourceId::as_str))
        .bind(track.source_type.as_str())
        .bind(FulfillmentStatus::Unfulfilled.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, track: &OrderTrack) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE order_tracks SET \
                source_id = $2, source_type = $3, source_status = $4, \
                store_status = $5, tracking_number = $6, hidden = $7, \
                seen = $8, data = $9, updated_at = $10, status_updated_at = $11 \
             WHERE id = $1",
        )
        .bind(track.id.as_i64())
        .bind(track.source_id.as_ref().map(SourceId::as_str))
        .bind(track.source_type.as_str())
        .bind(track.source_status.as_str())
        .bind(track.store_status.as_str())
        .bind(track.tracking_number.as_deref())
        .bind(track.hidden)
        .bind(track.seen)
        .bind(&track.data)
        .bind(track.updated_at)
        .bind(track.status_updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: TrackId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM order_tracks WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_order_items(&self, track: TrackId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM order_items WHERE track_id = $1")
            .bind(track.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
