//! Shopify REST Admin API adapter.
//!
//! Reshapes Shopify's order JSON into the common [`RawOrder`] shape. Orders
//! and fulfillments come from the same payload; notes are replaced with a
//! `PUT` on the order resource.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropkit_core::{FinancialStatus, LineId, OrderId, Platform, RawAddress, VariantId, parse_amount};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{OrderFilters, OrderPage, RawLineItem, RawOrder, Shipment, StoreAdapter};
use crate::error::UpstreamApiError;

const API_VERSION: &str = "2024-01";
const BODY_SNIPPET_LEN: usize = 256;

/// Adapter for one Shopify store.
#[derive(Clone)]
pub struct ShopifyAdapter {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl ShopifyAdapter {
    /// Create an adapter for a store.
    ///
    /// `base_url` is the store origin (e.g., `https://acme.myshopify.com`),
    /// without a trailing slash.
    #[must_use]
    pub fn new(base_url: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/admin/api/{API_VERSION}/{resource}", self.base_url)
    }

    async fn get_json(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<Value, UpstreamApiError> {
        let response = self
            .client
            .get(self.url(resource))
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .query(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn put_json(&self, resource: &str, body: &Value) -> Result<Value, UpstreamApiError> {
        let response = self
            .client
            .put(self.url(resource))
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, UpstreamApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(UpstreamApiError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet = body.chars().take(BODY_SNIPPET_LEN).collect();
            return Err(UpstreamApiError::from_status(status, snippet));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StoreAdapter for ShopifyAdapter {
    fn platform(&self) -> Platform {
        Platform::Shopify
    }

    #[instrument(skip(self, filters))]
    async fn list_orders(
        &self,
        filters: &OrderFilters,
        page: u32,
        per_page: u32,
    ) -> Result<OrderPage, UpstreamApiError> {
        let mut query = vec![
            ("status".to_string(), "any".to_string()),
            ("limit".to_string(), per_page.to_string()),
            ("page".to_string(), page.to_string()),
        ];
        let simplified = filters.simplified_for_api();
        if let Some(f) = simplified.fulfillment.first() {
            let value = match f {
                dropkit_core::FulfillmentStatus::Fulfilled => "shipped",
                dropkit_core::FulfillmentStatus::PartiallyFulfilled => "partial",
                dropkit_core::FulfillmentStatus::Unfulfilled => "unshipped",
            };
            query.push(("fulfillment_status".to_string(), value.to_string()));
        }
        if let Some(f) = simplified.financial.first() {
            let value = match f {
                FinancialStatus::Pending => "pending",
                FinancialStatus::Authorized => "authorized",
                FinancialStatus::Paid => "paid",
                FinancialStatus::PartiallyPaid => "partially_paid",
                FinancialStatus::Refunded => "refunded",
                FinancialStatus::PartiallyRefunded => "partially_refunded",
                FinancialStatus::Voided => "voided",
                FinancialStatus::Unknown => "any",
            };
            query.push(("financial_status".to_string(), value.to_string()));
        }
        if let Some(after) = simplified.created_after {
            query.push(("created_at_min".to_string(), after.to_rfc3339()));
        }
        if let Some(before) = simplified.created_before {
            query.push(("created_at_max".to_string(), before.to_rfc3339()));
        }

        let count: u64 = self
            .get_json("orders/count.json", &query)
            .await?
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or_default();

        let payload = self.get_json("orders.json", &query).await?;
        let orders = payload
            .get("orders")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(convert_order).collect())
            .unwrap_or_default();

        debug!(count, "Listed Shopify orders");
        Ok(OrderPage {
            orders,
            total_count: count,
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_order_shipments(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Shipment>, UpstreamApiError> {
        let payload = self
            .get_json(&format!("orders/{order_id}/fulfillments.json"), &[])
            .await?;
        Ok(payload
            .get("fulfillments")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(convert_fulfillment).collect())
            .unwrap_or_default())
    }

    #[instrument(skip(self, payload), fields(order_id = %order_id))]
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        payload: &Value,
    ) -> Result<(), UpstreamApiError> {
        let body = json!({"order": payload});
        self.put_json(&format!("orders/{order_id}.json"), &body)
            .await?;
        Ok(())
    }

    async fn get_order_note(&self, order_id: &OrderId) -> Result<Option<String>, UpstreamApiError> {
        let payload = self
            .get_json(
                &format!("orders/{order_id}.json"),
                &[("fields".to_string(), "note".to_string())],
            )
            .await?;
        Ok(payload
            .pointer("/order/note")
            .and_then(Value::as_str)
            .map(String::from))
    }

    async fn set_order_note(
        &self,
        order_id: &OrderId,
        note: &str,
    ) -> Result<(), UpstreamApiError> {
        let body = json!({"order": {"id": order_id.as_str(), "note": note}});
        self.put_json(&format!("orders/{order_id}.json"), &body)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_order(order: &Value) -> RawOrder {
    let str_at = |key: &str| order.get(key).and_then(Value::as_str).unwrap_or_default();
    RawOrder {
        id: OrderId::new(id_string(order.get("id"))),
        number: order
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_at: parse_datetime(str_at("created_at")),
        updated_at: parse_datetime(str_at("updated_at")),
        financial_status: FinancialStatus::parse(str_at("financial_status")),
        gateway: str_at("gateway").to_string(),
        currency: str_at("currency").to_string(),
        customer_email: order.get("email").and_then(Value::as_str).map(String::from),
        shipping_address: convert_address(order.get("shipping_address")),
        billing_address: order
            .get("billing_address")
            .filter(|a| !a.is_null())
            .map(|a| convert_address(Some(a))),
        phone: order.get("phone").and_then(Value::as_str).map(String::from),
        note: order.get("note").and_then(Value::as_str).map(String::from),
        line_items: order
            .get("line_items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(convert_line_item).collect())
            .unwrap_or_default(),
        shipments: order
            .get("fulfillments")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(convert_fulfillment).collect())
            .unwrap_or_default(),
        total: parse_amount(order.get("total_price").unwrap_or(&Value::Null)),
        cancelled_at: order
            .get("cancelled_at")
            .and_then(Value::as_str)
            .map(parse_datetime),
    }
}

fn convert_line_item(item: &Value) -> RawLineItem {
    RawLineItem {
        id: LineId::new(id_string(item.get("id"))),
        sku: item
            .get("sku")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        title: item
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        product_external_id: item
            .get("product_id")
            .filter(|v| !v.is_null())
            .map(|v| id_string(Some(v))),
        variant_id: item
            .get("variant_id")
            .filter(|v| !v.is_null())
            .map(|v| VariantId::new(id_string(Some(v)))),
        variant_title: item
            .get("variant_title")
            .and_then(Value::as_str)
            .map(String::from),
        quantity: item
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1),
        price: parse_amount(item.get("price").unwrap_or(&Value::Null)),
        properties: item
            .get("properties")
            .and_then(Value::as_array)
            .map(|props| {
                props
                    .iter()
                    .filter_map(|p| {
                        let name = p.get("name").and_then(Value::as_str)?;
                        let value = p.get("value").and_then(Value::as_str)?;
                        Some((name.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn convert_fulfillment(fulfillment: &Value) -> Shipment {
    Shipment {
        id: id_string(fulfillment.get("id")),
        tracking_number: fulfillment
            .get("tracking_number")
            .and_then(Value::as_str)
            .map(String::from),
        carrier: fulfillment
            .get("tracking_company")
            .and_then(Value::as_str)
            .map(String::from),
        skus: fulfillment
            .get("line_items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("sku").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn convert_address(address: Option<&Value>) -> RawAddress {
    address
        .cloned()
        .and_then(|a| serde_json::from_value(a).ok())
        .unwrap_or_default()
}

// Shopify sends numeric ids; keep them as strings like every other platform.
fn id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn parse_datetime(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
