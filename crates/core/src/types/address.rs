//! Raw and normalized shipping address shapes.
//!
//! [`RawAddress`] is the common denominator of what store platforms hand us:
//! every field optional, no shape guarantees. [`NormalizedAddress`] is the
//! canonical output of the address normalizer - all fields present (possibly
//! empty), names concatenated, ISO codes resolved to display names, and
//! country-specific corrections applied.

use serde::{Deserialize, Serialize};

/// A shipping or billing address exactly as a platform reported it.
///
/// Deserialization tolerates missing keys; downstream code must treat every
/// field as possibly absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawAddress {
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Pre-concatenated full name, when the platform sends one.
    pub name: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// First line of the address.
    pub address1: Option<String>,
    /// Second line of the address.
    pub address2: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Province or state display name.
    pub province: Option<String>,
    /// Province or state code.
    pub province_code: Option<String>,
    /// Postal/ZIP code.
    pub zip: Option<String>,
    /// Country display name.
    pub country: Option<String>,
    /// Country code (ISO 3166-1 alpha-2).
    pub country_code: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
}

/// Canonical shipping address produced by the normalizer.
///
/// This is the shape written into placement records and handed to the
/// supplier order form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedAddress {
    /// Concatenated, transliterated customer name.
    pub name: String,
    /// Company name, transliterated.
    pub company: String,
    /// Street line, transliterated; may include the merged second line.
    pub address1: String,
    /// Second street line (present when not merged into `address1`).
    pub address2: String,
    /// City, transliterated and possibly replaced by the AliExpress fix.
    pub city: String,
    /// Human-readable province/state name.
    pub province: String,
    /// Province/state code as reported.
    pub province_code: String,
    /// Corrected postal/ZIP code.
    pub zip: String,
    /// Human-readable country name (after pseudo-country reclassification).
    pub country: String,
    /// Country code, possibly rewritten for pseudo-countries (e.g., "PR").
    pub country_code: String,
    /// Phone number, digits preserved as given.
    pub phone: String,
}

/// Control flags for the address normalizer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressFlags {
    /// Validate (province, city) against the AliExpress address form and
    /// fold invalid provinces into "Other".
    pub aliexpress_fix: bool,
    /// With `aliexpress_fix`: fold the unmatched city into `address2` and
    /// replace the city with "Other" instead of folding into the province.
    pub aliexpress_fix_city: bool,
    /// Transliterate German umlauts to ASCII pairs (ä -> ae) instead of
    /// bare diacritic stripping.
    pub german_umlauts: bool,
    /// Apply ShipStation-compatible name/company swapping.
    pub shipstation_fix: bool,
}

/// A description of one correction the normalizer applied, for display or
/// logging next to the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressCorrection {
    /// Which field was changed (e.g., "zip", "province", "city").
    pub field: String,
    /// The value before correction.
    pub before: String,
    /// The value after correction.
    pub after: String,
    /// Short human-readable reason.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_address_tolerates_missing_keys() {
        let raw: RawAddress = serde_json::from_str(r#"{"city": "Paris"}"#).expect("parse");
        assert_eq!(raw.city.as_deref(), Some("Paris"));
        assert!(raw.zip.is_none());
    }

    #[test]
    fn test_raw_address_tolerates_unknown_keys() {
        let raw: RawAddress =
            serde_json::from_str(r#"{"city": "Paris", "latitude": 48.85}"#).expect("parse");
        assert_eq!(raw.city.as_deref(), Some("Paris"));
    }
}
