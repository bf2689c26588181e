//! Sales channel: a storefront/region partition supplied via the request
//! context.

use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, ZoneId};
use crate::money::CurrencyCode;

/// A sales-context partition (e.g. storefront or region).
///
/// Channels are resolved by the out-of-scope API layer and arrive fully
/// loaded; the core only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub code: String,
    pub currency: CurrencyCode,
    /// Whether prices entered on this channel already include tax.
    pub prices_include_tax: bool,
    /// Preferred tax zone, consulted first by the default zone strategy.
    pub default_tax_zone: Option<ZoneId>,
    /// ISO country code of the channel's home market.
    pub country: Option<String>,
}

impl Channel {
    pub fn new(code: impl Into<String>, currency: CurrencyCode) -> Self {
        Self {
            id: ChannelId::new(),
            code: code.into(),
            currency,
            prices_include_tax: false,
            default_tax_zone: None,
            country: None,
        }
    }

    pub fn with_prices_include_tax(mut self, includes: bool) -> Self {
        self.prices_include_tax = includes;
        self
    }

    pub fn with_default_tax_zone(mut self, zone: ZoneId) -> Self {
        self.default_tax_zone = Some(zone);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}
