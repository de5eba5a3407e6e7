//! Sales-channel platforms and supplier types.

use serde::{Deserialize, Serialize};

/// A supported sales-channel platform.
///
/// Facebook, eBay and Google storefronts are reached through the SureDone
/// intermediary and support multiple channel slots per account, so stores on
/// those platforms carry an instance index alongside the platform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Shopify,
    CommerceHq,
    WooCommerce,
    GrooveKart,
    BigCommerce,
    Facebook,
    Ebay,
    Google,
}

impl Platform {
    /// Whether orders for this platform flow through the SureDone API.
    #[must_use]
    pub const fn via_suredone(self) -> bool {
        matches!(self, Self::Facebook | Self::Ebay | Self::Google)
    }

    /// Whether the platform supports multiple channel instances per account.
    #[must_use]
    pub const fn multi_instance(self) -> bool {
        self.via_suredone()
    }

    /// Stable lowercase identifier used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shopify => "shopify",
            Self::CommerceHq => "chq",
            Self::WooCommerce => "woo",
            Self::GrooveKart => "gkart",
            Self::BigCommerce => "bigcommerce",
            Self::Facebook => "fb",
            Self::Ebay => "ebay",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external sourcing platform behind a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SupplierType {
    #[default]
    Aliexpress,
    Ebay,
    Other,
}

impl SupplierType {
    /// Parse a supplier type from a source URL or stored label.
    ///
    /// Unknown values fall back to [`SupplierType::Other`] - a supplier with
    /// an unrecognized source is still usable for manual ordering.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        let lower = source.to_lowercase();
        if lower.contains("aliexpress") {
            Self::Aliexpress
        } else if lower.contains("ebay") {
            Self::Ebay
        } else {
            Self::Other
        }
    }

    /// Stable identifier used in tracks and placement records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aliexpress => "aliexpress",
            Self::Ebay => "ebay",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for SupplierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suredone_channels() {
        assert!(Platform::Facebook.via_suredone());
        assert!(Platform::Ebay.via_suredone());
        assert!(Platform::Google.via_suredone());
        assert!(!Platform::Shopify.via_suredone());
    }

    #[test]
    fn test_supplier_type_from_source() {
        assert_eq!(
            SupplierType::from_source("https://www.aliexpress.com/item/123.html"),
            SupplierType::Aliexpress
        );
        assert_eq!(
            SupplierType::from_source("https://www.ebay.com/itm/456"),
            SupplierType::Ebay
        );
        assert_eq!(SupplierType::from_source("https://example.com"), SupplierType::Other);
    }
}
