//! Integer minor-unit money helpers.
//!
//! All monetary amounts in the domain are signed integers in the smallest
//! currency unit (e.g. cents). Fractions only ever appear transiently inside
//! a rounding helper; they are never stored.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// ISO-4217 currency code.
///
/// Modeled as an opaque string (e.g. "USD") so channels can be configured
/// without hardcoding a currency list into the domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(Cow<'static, str>);

impl CurrencyCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Divide `numerator / denominator`, rounding half away from zero.
///
/// This is the single rounding rule of the pricing core. It is applied exactly
/// once per materialized adjustment amount; intermediate values stay exact.
///
/// # Panics
///
/// Panics if `denominator` is zero or negative. Denominators in the pricing
/// core are fixed positive scale factors (e.g. 10_000 for basis points).
pub fn round_half_up(numerator: i64, denominator: i64) -> i64 {
    assert!(denominator > 0, "denominator must be positive");
    let n = i128::from(numerator);
    let d = i128::from(denominator);
    let rounded = if n >= 0 {
        (2 * n + d) / (2 * d)
    } else {
        -((2 * -n + d) / (2 * d))
    };
    rounded as i64
}
