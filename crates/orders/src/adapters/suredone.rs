//! SureDone adapter for Facebook/eBay/Google channel stores.
//!
//! SureDone fronts several marketplaces behind one API; a store maps to one
//! channel slot (instance index) on the account. Its order payloads are flat
//! key/value maps with prefixed address fields, and line items arrive as a
//! JSON-encoded *string* inside the order - both quirks are absorbed here so
//! the pipeline only ever sees [`RawOrder`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use dropkit_core::{FinancialStatus, LineId, OrderId, Platform, RawAddress, VariantId, parse_amount};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::{OrderFilters, OrderPage, RawLineItem, RawOrder, Shipment, StoreAdapter};
use crate::error::UpstreamApiError;

const BODY_SNIPPET_LEN: usize = 256;

/// Adapter for one SureDone-backed channel store.
#[derive(Clone)]
pub struct SureDoneAdapter {
    client: reqwest::Client,
    base_url: String,
    api_user: String,
    api_token: SecretString,
    platform: Platform,
    /// Channel slot on the SureDone account (1-based).
    instance: i32,
}

impl SureDoneAdapter {
    /// Create an adapter for one channel slot.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `platform` is a SureDone-fronted channel.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_user: impl Into<String>,
        api_token: SecretString,
        platform: Platform,
        instance: i32,
    ) -> Self {
        debug_assert!(platform.via_suredone());
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_user: api_user.into(),
            api_token,
            platform,
            instance,
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, UpstreamApiError> {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("X-Auth-User", &self.api_user)
            .header("X-Auth-Token", self.api_token.expose_secret())
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet = text.chars().take(BODY_SNIPPET_LEN).collect();
            return Err(UpstreamApiError::from_status(status, snippet));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StoreAdapter for SureDoneAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    #[instrument(skip(self, filters), fields(instance = self.instance))]
    async fn list_orders(
        &self,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError> {
        let mut query = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), per_page.to_string()),
            ("channel".to_string(), channel_name(self.platform, self.instance)),
        ];
        let simplified = filters.simplified_for_api();
        if let Some(q) = simplified.query {
            query.push(("q".to_string(), q));
        }
        if let Some(f) = simplified.fulfillment.first() {
            let value = match f {
                dropkit_core::FulfillmentStatus::Fulfilled => "COMPLETE",
                dropkit_core::FulfillmentStatus::PartiallyFulfilled => "PARTIAL",
                dropkit_core::FulfillmentStatus::Unfulfilled => "PENDING",
            };
            query.push(("shippingstatus".to_string(), value.to_string()));
        }

        let payload = self
            .request(reqwest::Method::GET, "/v1/orders/all", &query, None)
            .await?;
        let total = payload
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        let orders = payload
            .get("orders")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(convert_order).collect())
            .unwrap_or_default();

        debug!(total, "Listed SureDone orders");
        Ok(OrderPage {
            orders,
            total_count: total,
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_order_shipments(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Shipment>, UpstreamApiError> {
        let payload = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/orders/{order_id}"),
                &[],
                None,
            )
            .await?;
        Ok(payload
            .get("orders")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .map(convert_order)
            .map(|o| o.shipments)
            .unwrap_or_default())
    }

    #[instrument(skip(self, payload), fields(order_id = %order_id))]
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        payload: &Value,
    ) -> Result<(), UpstreamApiError> {
        self.request(
            reqwest::Method::POST,
            &format!("/v1/orders/{order_id}"),
            &[],
            Some(payload),
        )
        .await?;
        Ok(())
    }

    async fn get_order_note(&self, order_id: &OrderId) -> Result<Option<String>, UpstreamApiError> {
        let payload = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/orders/{order_id}"),
                &[],
                None,
            )
            .await?;
        Ok(payload
            .pointer("/orders/0/internalnotes")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(String::from))
    }

    async fn set_order_note(
        &self,
        order_id: &OrderId,
        note: &str,
    ) -> Result<(), UpstreamApiError> {
        let body = json!({"internalnotes": note});
        self.request(
            reqwest::Method::POST,
            &format!("/v1/orders/{order_id}"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }
}

fn channel_name(platform: Platform, instance: i32) -> String {
    // First slot carries no suffix; later slots append the index, matching
    // how SureDone prefixes per-channel fields (ebay, ebay2, fb, fb2...).
    if instance <= 1 {
        platform.as_str().to_string()
    } else {
        format!("{}{instance}", platform.as_str())
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_order(order: &Value) -> RawOrder {
    let str_at = |key: &str| order.get(key).and_then(Value::as_str).unwrap_or_default();
    let shipments = convert_shipments(order);
    RawOrder {
        id: OrderId::new(str_at("oid")),
        number: str_at("ordernumber").to_string(),
        created_at: parse_datetime(str_at("date")),
        updated_at: parse_datetime(str_at("dateutc")),
        financial_status: FinancialStatus::parse(str_at("paymentstatus")),
        gateway: str_at("paymentmethod").to_string(),
        currency: order
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string(),
        customer_email: order.get("email").and_then(Value::as_str).map(String::from),
        shipping_address: convert_address(order),
        billing_address: None,
        phone: order.get("phone").and_then(Value::as_str).map(String::from),
        note: order
            .get("internalnotes")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(String::from),
        line_items: convert_items(order),
        shipments,
        total: parse_amount(order.get("total").unwrap_or(&Value::Null)),
        cancelled_at: None,
    }
}

// SureDone embeds line items as a JSON-encoded string in `items`; a broken
// blob degrades to an empty line list rather than failing the order.
fn convert_items(order: &Value) -> Vec<RawLineItem> {
    let items: Vec<Value> = match order.get("items") {
        Some(Value::String(encoded)) => match serde_json::from_str(encoded) {
            Ok(items) => items,
            Err(error) => {
                warn!(%error, "Unparseable SureDone items blob");
                return Vec::new();
            }
        },
        Some(Value::Array(items)) => items.clone(),
        _ => return Vec::new(),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let str_at = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or_default();
            RawLineItem {
                // SureDone items carry no ids of their own; the position is
                // the stable line identity within an order.
                id: LineId::new((index + 1).to_string()),
                sku: str_at("sku").to_string(),
                title: str_at("title").to_string(),
                product_external_id: item
                    .get("guid")
                    .and_then(Value::as_str)
                    .filter(|g| !g.is_empty())
                    .map(String::from),
                variant_id: item
                    .get("guid")
                    .and_then(Value::as_str)
                    .filter(|g| !g.is_empty())
                    .map(VariantId::new),
                variant_title: None,
                quantity: item
                    .get("quantity")
                    .and_then(Value::as_u64)
                    .or_else(|| str_at("quantity").parse().ok())
                    .and_then(|q| u32::try_from(q).ok())
                    .unwrap_or(1),
                price: parse_amount(item.get("price").unwrap_or(&Value::Null)),
                properties: Vec::new(),
            }
        })
        .collect()
}

fn convert_shipments(order: &Value) -> Vec<Shipment> {
    let tracking = order
        .get("shippingtracking")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if tracking.is_empty() {
        return Vec::new();
    }
    // One shipment covering every line; SureDone has no per-line shipments.
    let skus = convert_items(order).into_iter().map(|i| i.sku).collect();
    vec![Shipment {
        id: format!("{}-shipment", order.get("oid").and_then(Value::as_str).unwrap_or_default()),
        tracking_number: Some(tracking.to_string()),
        carrier: order
            .get("shippingservice")
            .and_then(Value::as_str)
            .map(String::from),
        skus,
    }]
}

fn convert_address(order: &Value) -> RawAddress {
    let str_at = |key: &str| {
        order
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };
    RawAddress {
        first_name: str_at("sfirstname"),
        last_name: str_at("slastname"),
        name: None,
        company: str_at("scompany"),
        address1: str_at("saddress1"),
        address2: str_at("saddress2"),
        city: str_at("scity"),
        province: str_at("sstate"),
        province_code: None,
        zip: str_at("szip"),
        country: None,
        country_code: str_at("scountry"),
        phone: str_at("phone"),
    }
}

fn parse_datetime(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_default()
}
