//! Store platform adapters.
//!
//! Every supported sales channel implements [`StoreAdapter`], the one
//! polymorphic capability set the pipeline needs: list orders, fetch
//! shipments, push status updates, and append order notes. Each adapter is a
//! thin JSON reshaper between the platform's API shape and the common
//! [`RawOrder`] shape; the pipeline itself is written once against the trait.
//!
//! In-tree adapters:
//! - [`shopify::ShopifyAdapter`] - Shopify REST Admin API
//! - [`suredone::SureDoneAdapter`] - Facebook/eBay/Google channels via the
//!   SureDone intermediary (instance-indexed)

pub mod shopify;
pub mod suredone;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{FinancialStatus, FulfillmentStatus, LineId, OrderId, Platform, RawAddress, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamApiError;

pub use shopify::ShopifyAdapter;
pub use suredone::SureDoneAdapter;

// =============================================================================
// Common order shape
// =============================================================================

/// One order line as reshaped from a platform payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLineItem {
    /// Platform line id.
    pub id: LineId,
    /// Line SKU (used for shipment cross-referencing).
    pub sku: String,
    /// Product title at order time.
    pub title: String,
    /// Platform product id, when the platform links lines to products.
    pub product_external_id: Option<String>,
    /// Platform variant id.
    pub variant_id: Option<VariantId>,
    /// Variant title at order time.
    pub variant_title: Option<String>,
    /// Units ordered.
    pub quantity: u32,
    /// Unit price; zero when the platform value was unparseable.
    pub price: Decimal,
    /// Custom line-item properties. Keys starting with `_` are internal and
    /// excluded from generated note text.
    pub properties: Vec<(String, String)>,
}

/// A shipment/fulfillment as reported by the platform, reduced to what the
/// reconciler needs: which SKUs it covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    /// Platform shipment id.
    pub id: String,
    /// Carrier tracking number, when assigned.
    pub tracking_number: Option<String>,
    /// Carrier name.
    pub carrier: Option<String>,
    /// SKUs covered by this shipment.
    pub skus: Vec<String>,
}

/// One order as reshaped from a platform payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrder {
    /// Platform order id.
    pub id: OrderId,
    /// Display number ("#1001").
    pub number: String,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Platform-side last modification; drives mirror staleness detection.
    pub updated_at: DateTime<Utc>,
    /// Payment state.
    pub financial_status: FinancialStatus,
    /// Payment gateway name as reported ("paypal", "amazon_payments").
    pub gateway: String,
    /// Order currency code.
    pub currency: String,
    /// Customer email, when shared.
    pub customer_email: Option<String>,
    /// Shipping address as reported.
    pub shipping_address: RawAddress,
    /// Billing address, when distinct.
    pub billing_address: Option<RawAddress>,
    /// Customer phone, when the platform puts it outside the address.
    pub phone: Option<String>,
    /// Order note visible to the merchant.
    pub note: Option<String>,
    /// Order lines.
    pub line_items: Vec<RawLineItem>,
    /// Shipments included in the order payload (some platforms inline them).
    pub shipments: Vec<Shipment>,
    /// Order total.
    pub total: Decimal,
    /// Set when the order was cancelled platform-side.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl RawOrder {
    /// Whether payment is still pending at a gateway that holds funds
    /// (PayPal/Amazon). Placement records are not generated for these.
    #[must_use]
    pub fn is_pending_payment(&self) -> bool {
        if self.financial_status != FinancialStatus::Pending {
            return false;
        }
        let gateway = self.gateway.to_lowercase();
        gateway.contains("paypal") || gateway.contains("amazon")
    }
}

// =============================================================================
// Listing filters
// =============================================================================

/// Filters for an order listing request.
///
/// The search-index and database-mirror sources support the full set; the
/// direct API source supports a single fulfillment/financial value only
/// (see [`OrderFilters::simplified_for_api`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    /// Fulfillment states to include.
    pub fulfillment: Vec<FulfillmentStatus>,
    /// Financial states to include.
    pub financial: Vec<FinancialStatus>,
    /// Free-text query (order number, customer).
    pub query: Option<String>,
    /// Only orders created at/after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only orders created at/before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl OrderFilters {
    /// Reduce to what a platform's native list endpoint can express: at most
    /// one fulfillment and one financial value, no boolean combinations.
    #[must_use]
    pub fn simplified_for_api(&self) -> Self {
        Self {
            fulfillment: self.fulfillment.first().copied().into_iter().collect(),
            financial: self.financial.first().copied().into_iter().collect(),
            query: self.query.clone(),
            created_after: self.created_after,
            created_before: self.created_before,
        }
    }
}

/// One page of an order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    /// Orders on this page.
    pub orders: Vec<RawOrder>,
    /// Total matching orders across all pages.
    pub total_count: u64,
}

// =============================================================================
// The adapter trait
// =============================================================================

/// Capability set one sales-channel platform must provide.
///
/// Implementations are thin, stateless JSON reshapers; retries, mirroring,
/// and caching all live in the pipeline, not in adapters.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Which platform this adapter talks to.
    fn platform(&self) -> Platform;

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] for any non-2xx response.
    async fn list_orders(
        &self,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError>;

    /// Fetch the shipments for one order.
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] for any non-2xx response.
    async fn get_order_shipments(&self, order_id: &OrderId)
    -> Result<Vec<Shipment>, UpstreamApiError>;

    /// Push a status payload onto an order (platform-specific shape).
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] for any non-2xx response.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        payload: &serde_json::Value,
    ) -> Result<(), UpstreamApiError>;

    /// Read the current merchant note on an order.
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] for any non-2xx response.
    async fn get_order_note(&self, order_id: &OrderId) -> Result<Option<String>, UpstreamApiError>;

    /// Replace the merchant note on an order with the given text.
    ///
    /// The ledger reads the latest note, compares, and writes the combined
    /// text through this method - that read-compare-write is what makes the
    /// note append idempotent under at-least-once task delivery.
    ///
    /// # Errors
    ///
    /// Returns a classified [`UpstreamApiError`] for any non-2xx response.
    async fn set_order_note(&self, order_id: &OrderId, note: &str)
    -> Result<(), UpstreamApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_payment_gateways() {
        let mut order = RawOrder {
            id: OrderId::new("1"),
            number: "#1001".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            financial_status: FinancialStatus::Pending,
            gateway: "PayPal Express".into(),
            currency: "USD".into(),
            customer_email: None,
            shipping_address: RawAddress::default(),
            billing_address: None,
            phone: None,
            note: None,
            line_items: vec![],
            shipments: vec![],
            total: Decimal::ZERO,
            cancelled_at: None,
        };
        assert!(order.is_pending_payment());

        order.gateway = "amazon_payments".into();
        assert!(order.is_pending_payment());

        order.gateway = "shopify_payments".into();
        assert!(!order.is_pending_payment());

        order.gateway = "PayPal Express".into();
        order.financial_status = FinancialStatus::Paid;
        assert!(!order.is_pending_payment());
    }

    #[test]
    fn test_filters_simplified_for_api() {
        let filters = OrderFilters {
            fulfillment: vec![FulfillmentStatus::Unfulfilled, FulfillmentStatus::Fulfilled],
            financial: vec![FinancialStatus::Paid, FinancialStatus::Pending],
            query: Some("#1001".into()),
            ..Default::default()
        };
        let simplified = filters.simplified_for_api();
        assert_eq!(simplified.fulfillment, vec![FulfillmentStatus::Unfulfilled]);
        assert_eq!(simplified.financial, vec![FinancialStatus::Paid]);
        assert_eq!(simplified.query.as_deref(), Some("#1001"));
    }
}
