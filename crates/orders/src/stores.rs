//! Store lifecycle operations.
//!
//! Disconnecting a store deactivates the row immediately and hands product
//! deletion to a background task - the user's request returns as soon as
//! the store stops appearing, while the catalog cleanup runs behind it.

use dropkit_core::{StoreId, UserId};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{ProductRepository, StoreRepository};
use crate::error::OrderFlowError;
use crate::permissions::{PermissionOracle, Resource, ensure_delete};
use crate::tasks::TaskDispatcher;

/// Deactivate a store and schedule deletion of its products.
///
/// Returns the background task id; completion of the cleanup is never
/// assumed by the caller.
///
/// # Errors
///
/// Permission and repository failures. The store row must exist.
#[instrument(skip(stores, products, permissions, tasks), fields(store_id = %store_id))]
pub async fn disconnect_store(
    stores: &StoreRepository,
    products: ProductRepository,
    permissions: &dyn PermissionOracle,
    tasks: &TaskDispatcher,
    user: UserId,
    store_id: StoreId,
) -> Result<Uuid, OrderFlowError> {
    ensure_delete(permissions, user, Resource::Store(store_id)).await?;

    stores.deactivate(store_id).await.map_err(|e| match e {
        crate::db::RepositoryError::NotFound => {
            OrderFlowError::NotFound(format!("store {store_id}"))
        }
        other => OrderFlowError::Repository(other),
    })?;

    let task = tasks.spawn(async move {
        match products.delete_store_products(store_id).await {
            Ok(deleted) => info!(store_id = %store_id, deleted, "Disconnected store cleaned up"),
            Err(error) => warn!(%error, store_id = %store_id, "Store product cleanup failed"),
        }
    });
    info!(task_id = %task, "Store disconnected");
    Ok(task)
}
