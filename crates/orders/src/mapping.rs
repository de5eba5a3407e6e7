//! Variant-Supplier Mapper.
//!
//! Resolves which supplier, shipping method, and bundle constituents apply
//! to a given product variant. Mapping state arrives as JSON blobs written
//! by several generations of the product editor, so deserialization here is
//! deliberately lenient: every legacy shape parses, and anything
//! unrecognizable degrades to "no mapping" instead of raising.

use std::collections::HashMap;

use dropkit_core::{ProductId, SupplierId, VariantId};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{BundleLine, CatalogProduct, Supplier};

/// How the per-variant supplier is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Every variant uses the product's default supplier.
    #[default]
    Default,
    /// Variants carry individual supplier assignments; unmapped variants
    /// fall back to the default supplier.
    Advanced,
}

/// One shipping option configured for a (supplier, variant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRule {
    /// Destination country code this rule applies to.
    pub country: String,
    /// Carrier/service identifier on the supplier side.
    pub method: String,
    /// Display name, when the editor stored one.
    #[serde(default)]
    pub method_name: Option<String>,
}

/// One bundle constituent as stored in the bundle mapping blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Child product (local id).
    #[serde(alias = "id")]
    pub product_id: ProductId,
    /// Child variant.
    #[serde(alias = "variant")]
    pub variant_id: VariantId,
    /// Child SKU for display/fulfillment matching.
    #[serde(default)]
    pub sku: String,
    /// Units of the child per one unit of the bundle.
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Typed mapping state for one product, parsed from the stored blobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMappings {
    /// Supplier selection mode.
    pub mode: MappingMode,
    /// Per-variant supplier assignments (advanced mode), keyed by the
    /// stringified variant id.
    pub variant_suppliers: HashMap<String, SupplierId>,
    /// Shipping rules keyed by supplier id, then variant id.
    pub shipping: HashMap<String, HashMap<String, Vec<ShippingRule>>>,
    /// Bundle constituents keyed by the bundle variant id.
    pub bundles: HashMap<String, Vec<BundleEntry>>,
}

impl ProductMappings {
    /// Parse mapping state from the stored JSON blobs, tolerating every
    /// legacy shape. Unparseable sections degrade to empty.
    #[must_use]
    pub fn from_blobs(
        config: &serde_json::Value,
        variant_suppliers: &serde_json::Value,
        shipping: &serde_json::Value,
        bundles: &serde_json::Value,
    ) -> Self {
        Self {
            mode: parse_mode(config),
            variant_suppliers: parse_variant_suppliers(variant_suppliers),
            shipping: parse_shipping(shipping),
            bundles: parse_bundles(bundles),
        }
    }

    /// Whether the given variant is a bundle.
    #[must_use]
    pub fn is_bundle(&self, variant_id: &VariantId) -> bool {
        self.bundles.contains_key(variant_id.as_str())
    }
}

// Accepts `{"supplier": "advanced"}`, a bare `"advanced"`, or anything else
// (treated as default) - the editor wrote all three over the years.
fn parse_mode(config: &serde_json::Value) -> MappingMode {
    let raw = config
        .get("supplier")
        .and_then(serde_json::Value::as_str)
        .or_else(|| config.as_str());
    match raw {
        Some("advanced") => MappingMode::Advanced,
        _ => MappingMode::Default,
    }
}

// Accepts `{"123": 7}`, `{"123": "7"}`, and `{"123": {"supplier": 7}}`.
fn parse_variant_suppliers(blob: &serde_json::Value) -> HashMap<String, SupplierId> {
    let Some(map) = blob.as_object() else {
        return HashMap::new();
    };
    let mut out = HashMap::new();
    for (variant, value) in map {
        let id = value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .or_else(|| value.get("supplier").and_then(serde_json::Value::as_i64));
        if let Some(id) = id {
            out.insert(variant.clone(), SupplierId::new(id));
        } else {
            warn!(variant = %variant, "Unparseable supplier assignment, skipping");
        }
    }
    out
}

// Current shape nests by supplier then variant; the legacy shape used flat
// `"{supplier}_{variant}"` keys.
fn parse_shipping(
    blob: &serde_json::Value,
) -> HashMap<String, HashMap<String, Vec<ShippingRule>>> {
    let Some(map) = blob.as_object() else {
        return HashMap::new();
    };
    let mut out: HashMap<String, HashMap<String, Vec<ShippingRule>>> = HashMap::new();
    for (key, value) in map {
        if let Some((supplier, variant)) = key.split_once('_') {
            if let Ok(rules) = serde_json::from_value::<Vec<ShippingRule>>(value.clone()) {
                out.entry(supplier.to_string())
                    .or_default()
                    .insert(variant.to_string(), rules);
            }
        } else if let Ok(variants) =
            serde_json::from_value::<HashMap<String, Vec<ShippingRule>>>(value.clone())
        {
            out.entry(key.clone()).or_default().extend(variants);
        }
    }
    out
}

fn parse_bundles(blob: &serde_json::Value) -> HashMap<String, Vec<BundleEntry>> {
    let Some(map) = blob.as_object() else {
        return HashMap::new();
    };
    map.iter()
        .filter_map(|(variant, value)| {
            serde_json::from_value::<Vec<BundleEntry>>(value.clone())
                .ok()
                .map(|entries| (variant.clone(), entries))
        })
        .collect()
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the supplier for a variant.
///
/// Resolution order: explicit override, then the per-variant assignment in
/// advanced mode, then the product's default supplier. Returns `None` only
/// when the product has no suppliers at all.
#[must_use]
pub fn resolve_supplier<'a>(
    product: &'a CatalogProduct,
    variant_id: Option<&VariantId>,
    explicit: Option<SupplierId>,
) -> Option<&'a Supplier> {
    if let Some(id) = explicit {
        return product.supplier(id).or_else(|| product.default_supplier());
    }
    if product.product.mappings.mode == MappingMode::Advanced
        && let Some(variant) = variant_id
        && let Some(assigned) = product
            .product
            .mappings
            .variant_suppliers
            .get(variant.as_str())
        && let Some(supplier) = product.supplier(*assigned)
    {
        return Some(supplier);
    }
    product.default_supplier()
}

/// Resolve the configured shipping method for a (supplier, variant,
/// destination country) triple.
///
/// `None` means "unresolved, do not block order placement" - callers pass
/// the order through without a preselected method.
#[must_use]
pub fn resolve_shipping_method<'a>(
    mappings: &'a ProductMappings,
    supplier_id: SupplierId,
    variant_id: Option<&VariantId>,
    country_code: &str,
) -> Option<&'a ShippingRule> {
    let variants = mappings.shipping.get(&supplier_id.as_i64().to_string())?;
    let rules = variants.get(variant_id?.as_str())?;
    rules
        .iter()
        .find(|r| r.country.eq_ignore_ascii_case(country_code))
        .or_else(|| rules.iter().find(|r| r.country == "*"))
}

/// Resolve bundle constituents for a bundle variant.
///
/// Quantity for each sub-line is always `child_quantity * parent_quantity`.
/// A non-bundle variant yields an empty list.
#[must_use]
pub fn bundle_lines(
    mappings: &ProductMappings,
    variant_id: &VariantId,
    parent_quantity: u32,
) -> Vec<BundleLine> {
    mappings
        .bundles
        .get(variant_id.as_str())
        .map(|entries| {
            entries
                .iter()
                .map(|e| BundleLine {
                    product_id: e.product_id,
                    variant_id: e.variant_id.clone(),
                    sku: e.sku.clone(),
                    quantity: e.quantity * parent_quantity,
                })
                .collect()
        })
        .unwrap_or_default()
}
