//! Local relational mirror of platform orders.
//!
//! Each mirrored order is stored whole as JSON next to the columns the
//! listing filters need, so the mirror can answer the full filter set the
//! platform APIs cannot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{OrderId, StoreId};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::adapters::{OrderFilters, OrderPage, RawOrder};
use crate::sync::OrderMirror;

/// Postgres-backed [`OrderMirror`].
#[derive(Clone)]
pub struct PgOrderMirror {
    pool: PgPool,
}

impl PgOrderMirror {
    /// Wrap a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MirrorRow {
    data: serde_json::Value,
}

fn apply_filters(builder: &mut QueryBuilder<'_, Postgres>, store: StoreId, filters: &OrderFilters) {
    builder.push(" WHERE store_id = ").push_bind(store.as_i64());
    if !filters.fulfillment.is_empty() {
        let values: Vec<String> = filters
            .fulfillment
            .iter()
            .map(|f| f.as_str().to_string())
            .collect();
        builder
            .push(" AND fulfillment_status = ANY(")
            .push_bind(values)
            .push(")");
    }
    if !filters.financial.is_empty() {
        let values: Vec<String> = filters
            .financial
            .iter()
            .map(|f| f.as_str().to_string())
            .collect();
        builder
            .push(" AND financial_status = ANY(")
            .push_bind(values)
            .push(")");
    }
    if let Some(query) = &filters.query {
        builder
            .push(" AND order_number ILIKE ")
            .push_bind(format!("%{query}%"));
    }
    if let Some(after) = filters.created_after {
        builder.push(" AND created_at >= ").push_bind(after);
    }
    if let Some(before) = filters.created_before {
        builder.push(" AND created_at <= ").push_bind(before);
    }
}

#[async_trait]
impl OrderMirror for PgOrderMirror {
    async fn query_orders(
        &self,
        store: StoreId,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders_mirror");
        apply_filters(&mut count, store, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT data FROM orders_mirror");
        apply_filters(&mut select, store, filters);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(per_page))
            .push(" OFFSET ")
            .push_bind(i64::from(page.saturating_sub(1)) * i64::from(per_page));
        let rows: Vec<MirrorRow> = select.build_query_as().fetch_all(&self.pool).await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row.data)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
            })
            .collect::<Result<Vec<RawOrder>, _>>()?;

        Ok(OrderPage {
            orders,
            total_count: total.try_into().unwrap_or_default(),
        })
    }

    async fn synced_updated_at(
        &self,
        store: StoreId,
        order: &OrderId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let updated: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM orders_mirror WHERE store_id = $1 AND order_id = $2",
        )
        .bind(store.as_i64())
        .bind(order.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn upsert_order(&self, store: StoreId, order: &RawOrder) -> Result<(), RepositoryError> {
        let data = serde_json::to_value(order)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        sqlx::query(
            "INSERT INTO orders_mirror \
             (store_id, order_id, order_number, financial_status, \
              fulfillment_status, created_at, updated_at, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (store_id, order_id) DO UPDATE SET \
                order_number = EXCLUDED.order_number, \
                financial_status = EXCLUDED.financial_status, \
                fulfillment_status = EXCLUDED.fulfillment_status, \
                updated_at = EXCLUDED.updated_at, \
                data = EXCLUDED.data",
        )
        .bind(store.as_i64())
        .bind(order.id.as_str())
        .bind(&order.number)
        .bind(order.financial_status.as_str())
        .bind(aggregate_column(order))
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// The filterable fulfillment column, derived from the order's shipments.
fn aggregate_column(order: &RawOrder) -> &'static str {
    let lines: Vec<_> = order
        .line_items
        .iter()
        .map(|l| {
            (
                l.id.clone(),
                crate::reconcile::line_status(&l.sku, &order.shipments),
            )
        })
        .collect();
    crate::reconcile::aggregate_status(&lines)
        .map_or("unfulfilled", dropkit_core::FulfillmentStatus::as_str)
}
