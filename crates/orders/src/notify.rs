//! Fire-and-forget notification sink.
//!
//! Cancellation alerts and similar user-facing messages go through this
//! seam. Delivery is best-effort: a failed send is logged and never blocks
//! or fails the calling flow.

use async_trait::async_trait;
use dropkit_core::{OrderId, SourceId, SourceStatus, StoreId, UserId};
use tracing::warn;

/// A user-facing alert about an order.
#[derive(Debug, Clone)]
pub enum OrderAlert {
    /// A supplier order transitioned into a cancelled/refunded status.
    SupplierOrderCancelled {
        user_id: UserId,
        store_id: StoreId,
        order_id: OrderId,
        source_id: SourceId,
        status: SourceStatus,
    },
}

/// Delivers alerts (email or otherwise) outside this crate.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns the sink's failure; callers go through [`notify`] which
    /// swallows it.
    async fn send(&self, alert: OrderAlert) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Send an alert, logging failure instead of propagating it.
pub async fn notify(sink: &dyn NotificationSink, alert: OrderAlert) {
    if let Err(error) = sink.send(alert).await {
        warn!(%error, "Failed to deliver notification");
    }
}

/// Sink that drops every alert. Used where no delivery channel is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn send(
        &self,
        _alert: OrderAlert,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
