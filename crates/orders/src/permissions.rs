//! Ownership and subuser-permission checks.
//!
//! The rule set lives outside this crate; the pipeline only needs a yes/no
//! oracle and calls it before every entity read or mutation. Helpers here
//! convert a "no" into [`OrderFlowError::PermissionDenied`] with a stable
//! resource description.

use async_trait::async_trait;
use dropkit_core::{ProductId, StoreId, SupplierId, TrackId, UserId};

use crate::error::OrderFlowError;

/// An entity a permission question can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Store(StoreId),
    Product(ProductId),
    Supplier(SupplierId),
    Track(TrackId),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(id) => write!(f, "store {id}"),
            Self::Product(id) => write!(f, "product {id}"),
            Self::Supplier(id) => write!(f, "supplier {id}"),
            Self::Track(id) => write!(f, "order track {id}"),
        }
    }
}

/// Answers ownership/subuser-permission questions.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Whether the user may read the resource.
    async fn can_view(&self, user: UserId, resource: Resource) -> bool;

    /// Whether the user may modify the resource.
    async fn can_edit(&self, user: UserId, resource: Resource) -> bool;

    /// Whether the user may delete the resource.
    async fn can_delete(&self, user: UserId, resource: Resource) -> bool;
}

/// Fail with a permission error unless the user may read the resource.
///
/// # Errors
///
/// Returns [`OrderFlowError::PermissionDenied`] when the oracle says no.
pub async fn ensure_view(
    oracle: &dyn PermissionOracle,
    user: UserId,
    resource: Resource,
) -> Result<(), OrderFlowError> {
    if oracle.can_view(user, resource).await {
        Ok(())
    } else {
        Err(OrderFlowError::PermissionDenied(resource.to_string()))
    }
}

/// Fail with a permission error unless the user may modify the resource.
///
/// # Errors
///
/// Returns [`OrderFlowError::PermissionDenied`] when the oracle says no.
pub async fn ensure_edit(
    oracle: &dyn PermissionOracle,
    user: UserId,
    resource: Resource,
) -> Result<(), OrderFlowError> {
    if oracle.can_edit(user, resource).await {
        Ok(())
    } else {
        Err(OrderFlowError::PermissionDenied(resource.to_string()))
    }
}

/// Fail with a permission error unless the user may delete the resource.
///
/// # Errors
///
/// Returns [`OrderFlowError::PermissionDenied`] when the oracle says no.
pub async fn ensure_delete(
    oracle: &dyn PermissionOracle,
    user: UserId,
    resource: Resource,
) -> Result<(), OrderFlowError> {
    if oracle.can_delete(user, resource).await {
        Ok(())
    } else {
        Err(OrderFlowError::PermissionDenied(resource.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OwnerOnly {
        owner: UserId,
    }

    #[async_trait]
    impl PermissionOracle for OwnerOnly {
        async fn can_view(&self, user: UserId, _resource: Resource) -> bool {
            user == self.owner
        }

        async fn can_edit(&self, user: UserId, _resource: Resource) -> bool {
            user == self.owner
        }

        async fn can_delete(&self, user: UserId, _resource: Resource) -> bool {
            user == self.owner
        }
    }

    #[tokio::test]
    async fn test_ensure_edit_denies_non_owner() {
        let oracle = OwnerOnly {
            owner: UserId::new(1),
        };
        let resource = Resource::Store(StoreId::new(5));
        assert!(ensure_edit(&oracle, UserId::new(1), resource).await.is_ok());
        assert!(matches!(
            ensure_edit(&oracle, UserId::new(2), resource).await,
            Err(OrderFlowError::PermissionDenied(_))
        ));
    }
}
