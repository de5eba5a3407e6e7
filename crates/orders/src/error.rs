//! Unified error handling for the reconciliation pipeline.
//!
//! Components degrade where they can (address normalizer, mapper, price
//! parsing) and raise typed errors only where the caller has to decide
//! something (ledger conflicts, permission failures, upstream outages). The
//! view layer consuming this crate shows [`OrderFlowError::user_message`] to
//! the end user - raw errors never reach them.

use dropkit_core::{LineId, OrderId, SourceId};
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;

/// A non-2xx or failed call to a store platform or supplier feed, classified
/// by HTTP status into retryable, terminal, and unknown.
#[derive(Debug, Error)]
pub enum UpstreamApiError {
    /// Rate limited by the platform (HTTP 429). Retryable.
    #[error("rate limited{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited {
        /// Platform-suggested backoff, when the response carried one.
        retry_after_secs: Option<u64>,
    },

    /// Platform temporarily down (HTTP 503). Retryable.
    #[error("service unavailable")]
    ServiceUnavailable,

    /// Platform account suspended or plan expired (HTTP 402). Terminal.
    #[error("payment required by platform")]
    PaymentRequired,

    /// Resource gone on the platform side (HTTP 404). Terminal.
    #[error("not found upstream: {0}")]
    NotFound(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Any other non-2xx status.
    #[error("unexpected upstream status {status}: {body}")]
    Unexpected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the caller.
        body: String,
    },
}

impl UpstreamApiError {
    /// Classify a non-2xx response status.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited {
                retry_after_secs: None,
            },
            503 => Self::ServiceUnavailable,
            402 => Self::PaymentRequired,
            404 => Self::NotFound(body),
            code => Self::Unexpected { status: code, body },
        }
    }

    /// Whether the background task layer may retry this call.
    ///
    /// Retry never happens inline on the request path; callers surface
    /// retryable errors as a transient "try again" message.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::ServiceUnavailable)
    }
}

/// Pipeline-level error type.
#[derive(Debug, Error)]
pub enum OrderFlowError {
    /// Store/product/supplier/track absent. Surfaced as 404-equivalent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ownership or subuser-permission check failed. Surfaced as 403.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The order line already has a different supplier order id attached.
    /// Overridable with `forced = true`.
    #[error("order {order_id} line {line_id} already has a supplier order ID")]
    DuplicateSupplierOrder {
        /// Platform order id.
        order_id: OrderId,
        /// Platform line id.
        line_id: LineId,
    },

    /// The supplier order id is already linked to another order in the same
    /// store. Overridable with `forced = true`.
    #[error("supplier order ID {source_id} is linked to another order ({other_order})")]
    SupplierOrderReuse {
        /// The reused supplier order id.
        source_id: SourceId,
        /// The order it is already attached to.
        other_order: OrderId,
    },

    /// Store platform or supplier feed call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamApiError),

    /// Unparseable JSON/price/date field that could not be degraded away.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl OrderFlowError {
    /// The message shown to the end user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{what} was not found"),
            Self::PermissionDenied(_) => "You don't have permission to do that".to_string(),
            Self::DuplicateSupplierOrder { .. } => {
                "This order already has a supplier order ID".to_string()
            }
            Self::SupplierOrderReuse { other_order, .. } => {
                format!("This supplier order ID is linked to another order (#{other_order})")
            }
            Self::Upstream(e) if e.is_retryable() => {
                "The store is busy right now, please try again in a moment".to_string()
            }
            Self::Upstream(UpstreamApiError::PaymentRequired) => {
                "The store account requires payment before orders can be accessed".to_string()
            }
            Self::Upstream(_) => "The store could not be reached".to_string(),
            Self::MalformedData(_) | Self::Repository(_) | Self::Config(_) => {
                "Something went wrong on our side".to_string()
            }
        }
    }
}
