//! Fulfillment status reconciliation.
//!
//! Merges an order's platform shipments with the track ledger: per-line
//! status comes from SKU membership in any shipment, the per-order aggregate
//! from the line statuses. Everything here is a computed view except one
//! write: a track whose stored status has drifted from the freshly computed
//! value is persisted with the new one.

use dropkit_core::{FulfillmentStatus, LineId, StoreId};
use tracing::{debug, instrument};

use crate::adapters::{RawOrder, Shipment};
use crate::error::OrderFlowError;
use crate::tracks::TrackStore;

/// Reconciled view of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFulfillment {
    /// Per-line status, in the order's line order.
    pub lines: Vec<(LineId, FulfillmentStatus)>,
    /// Aggregate status; `None` when no line is fulfilled.
    pub aggregate: Option<FulfillmentStatus>,
}

/// Status of one line: fulfilled when its SKU appears in any shipment.
#[must_use]
pub fn line_status(sku: &str, shipments: &[Shipment]) -> FulfillmentStatus {
    let covered = !sku.is_empty()
        && shipments
            .iter()
            .any(|s| s.skus.iter().any(|shipped| shipped == sku));
    if covered {
        FulfillmentStatus::Fulfilled
    } else {
        FulfillmentStatus::Unfulfilled
    }
}

/// Aggregate an order's line statuses.
///
/// All lines fulfilled yields `Fulfilled`, some yields
/// `Partially Fulfilled`, none (or an empty order) yields `None`.
#[must_use]
pub fn aggregate_status(lines: &[(LineId, FulfillmentStatus)]) -> Option<FulfillmentStatus> {
    let total = lines.len();
    let fulfilled = lines
        .iter()
        .filter(|(_, s)| *s == FulfillmentStatus::Fulfilled)
        .count();
    match fulfilled {
        0 => None,
        n if n == total => Some(FulfillmentStatus::Fulfilled),
        _ => Some(FulfillmentStatus::PartiallyFulfilled),
    }
}

/// Reconcile one order against its shipments and persist drifted tracks.
///
/// The aggregate is computed only after every line has been visited. For
/// each ledger row on the order whose stored status differs from the line's
/// computed status, the row is updated; this is the sole mutation the
/// reconciler performs.
///
/// # Errors
///
/// Repository failures reading or writing track rows.
#[instrument(skip(tracks, order), fields(store_id = %store_id, order_id = %order.id))]
pub async fn reconcile_order(
    tracks: &dyn TrackStore,
    store_id: StoreId,
    order: &RawOrder,
) -> Result<OrderFulfillment, OrderFlowError> {
    let lines: Vec<(LineId, FulfillmentStatus)> = order
        .line_items
        .iter()
        .map(|line| (line.id.clone(), line_status(&line.sku, &order.shipments)))
        .collect();
    let aggregate = aggregate_status(&lines);

    for row in tracks.find_for_order(store_id, &order.id).await? {
        let Some((_, computed)) = lines.iter().find(|(id, _)| *id == row.line_id) else {
            continue;
        };
        if row.store_status != *computed {
            debug!(
                track_id = %row.id,
                from = %row.store_status,
                to = %computed,
                "Track fulfillment status drifted"
            );
            let mut updated = row;
            updated.store_status = *computed;
            updated.updated_at = chrono::Utc::now();
            tracks.update(&updated).await?;
        }
    }

    Ok(OrderFulfillment { lines, aggregate })
}
