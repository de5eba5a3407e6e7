//! Money amounts and lenient platform price parsing.
//!
//! Store platforms disagree on how prices come over the wire: Shopify sends
//! `"19.99"`, WooCommerce may send a float, GrooveKart localized strings like
//! `"1.234,56"`, and SureDone occasionally sends an empty string. The
//! reconciliation pipeline never fails an order over a bad price, so parsing
//! degrades to zero instead of raising.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in a platform-reported currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code as reported by the platform (e.g., "USD").
    pub currency: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// Parse a platform price field into a [`Decimal`], degrading to zero.
///
/// Accepts raw JSON values (string or number), currency symbols, thousands
/// separators in either US (`1,234.56`) or European (`1.234,56`) convention.
/// Anything unparseable yields `Decimal::ZERO` - callers must treat a zero
/// price as "unknown", not as an error.
#[must_use]
pub fn parse_amount(raw: &serde_json::Value) -> Decimal {
    match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .unwrap_or(Decimal::ZERO),
        serde_json::Value::String(s) => parse_amount_str(s),
        _ => Decimal::ZERO,
    }
}

/// String form of [`parse_amount`].
#[must_use]
pub fn parse_amount_str(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        // Both present: the later one is the decimal separator.
        (Some(d), Some(c)) if d > c => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        // Comma only: decimal separator when at most two digits follow,
        // thousands separator otherwise ("1,234" is 1234).
        (None, Some(c)) => {
            if cleaned.len().saturating_sub(c + 1) <= 2 && cleaned.matches(',').count() == 1 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    normalized.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}
