//! Order status enums and supplier status passthrough.

use serde::{Deserialize, Serialize};

/// Fulfillment status for a single order line or a whole order.
///
/// The aggregate for an order is `None` (unset) when no line is fulfilled;
/// see the reconciler for the aggregation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
}

impl FulfillmentStatus {
    /// Stable identifier used in storage and API queries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfulfilled => "unfulfilled",
            Self::PartiallyFulfilled => "partially_fulfilled",
            Self::Fulfilled => "fulfilled",
        }
    }

    /// Lenient parse from a stored or platform-reported value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().replace([' ', '-'], "_").as_str() {
            "fulfilled" | "shipped" | "complete" => Self::Fulfilled,
            "partially_fulfilled" | "partial" => Self::PartiallyFulfilled,
            _ => Self::Unfulfilled,
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unfulfilled => write!(f, "Unfulfilled"),
            Self::PartiallyFulfilled => write!(f, "Partially Fulfilled"),
            Self::Fulfilled => write!(f, "Fulfilled"),
        }
    }
}

/// Financial status as reported by the store platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
    #[default]
    Pending,
    Authorized,
    Paid,
    PartiallyPaid,
    Refunded,
    PartiallyRefunded,
    Voided,
    Unknown,
}

impl FinancialStatus {
    /// Lenient parse from a platform status string.
    ///
    /// Platforms report these in assorted casings; anything unrecognized maps
    /// to [`FinancialStatus::Unknown`] rather than failing the order.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().replace('-', "_").as_str() {
            "pending" => Self::Pending,
            "authorized" => Self::Authorized,
            "paid" | "complete" | "completed" | "processing" => Self::Paid,
            "partially_paid" => Self::PartiallyPaid,
            "refunded" => Self::Refunded,
            "partially_refunded" => Self::PartiallyRefunded,
            "voided" | "cancelled" | "canceled" => Self::Voided,
            _ => Self::Unknown,
        }
    }

    /// Stable identifier used in storage and API queries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Paid => "paid",
            Self::PartiallyPaid => "partially_paid",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Voided => "voided",
            Self::Unknown => "unknown",
        }
    }
}

/// AliExpress order statuses the UI treats as rejected/terminal.
pub const ALIEXPRESS_REJECTED_STATUSES: &[&str] = &[
    "buyer_pay_timeout",
    "risk_reject_closed",
    "buyer_accept_goods_timeout",
    "buyer_cancel_notpay_order",
    "cancel_order_close_trade",
    "seller_send_goods_timeout",
    "buyer_cancel_order_in_risk",
    "seller_accept_issue_no_goods_return",
    "seller_response_issue_timeout",
];

/// Supplier-reported order status.
///
/// There is no fixed enum: values pass through from the supplier platform
/// verbatim. A small set of AliExpress statuses is recognized as terminal
/// ([`ALIEXPRESS_REJECTED_STATUSES`]) and a cancelled/refunded transition
/// triggers a cancellation alert downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SourceStatus(String);

impl SourceStatus {
    /// Wrap a platform-reported status string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw platform value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the supplier has not reported a status yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is one of the AliExpress rejected/terminal statuses.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        ALIEXPRESS_REJECTED_STATUSES.contains(&self.0.to_lowercase().as_str())
    }

    /// Whether this status indicates the supplier order was cancelled or
    /// refunded. Entering this state fires the cancellation alert.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let lower = self.0.to_lowercase();
        lower.contains("cancel") || lower.contains("refund") || self.is_rejected()
    }

    /// Whether the supplier considers the order complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.0.to_lowercase().as_str(), "finish" | "finished" | "completed" | "delivered")
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceStatus {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
