//! Tax model: zones, rates, and the tax calculator.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tradewind_auth::RequestContext;
use tradewind_core::{round_half_up, Channel, TaxCategoryId, ZoneId};
use tradewind_orders::{Adjustment, Order};

use crate::error::{PricingError, PricingResult};

/// Tax rates are expressed in basis points: 20% == 2000.
pub const BASIS_POINTS: i64 = 10_000;

/// A geographic grouping used to resolve applicable tax rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub member_countries: BTreeSet<String>,
}

impl Zone {
    pub fn new(name: impl Into<String>, countries: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            id: ZoneId::new(),
            name: name.into(),
            member_countries: countries.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn contains_country(&self, country: &str) -> bool {
        self.member_countries.contains(country)
    }
}

/// Supplies the zones visible to a request.
pub trait ZoneProvider: Send + Sync {
    fn find_all(&self, ctx: &RequestContext) -> Vec<Zone>;
}

/// Fixed zone list, loaded explicitly before the pipeline runs.
pub struct StaticZones(pub Vec<Zone>);

impl ZoneProvider for StaticZones {
    fn find_all(&self, _ctx: &RequestContext) -> Vec<Zone> {
        self.0.clone()
    }
}

/// Resolves the active tax zone for an order.
pub trait TaxZoneStrategy: Send + Sync {
    fn determine_tax_zone(&self, zones: &[Zone], channel: &Channel, order: &Order)
        -> Option<Zone>;
}

/// Default resolution: the channel's configured zone if present, else the
/// zone covering the channel's home country, else the first configured zone.
#[derive(Debug, Default, Clone)]
pub struct DefaultTaxZoneStrategy;

impl TaxZoneStrategy for DefaultTaxZoneStrategy {
    fn determine_tax_zone(
        &self,
        zones: &[Zone],
        channel: &Channel,
        _order: &Order,
    ) -> Option<Zone> {
        if let Some(zone_id) = channel.default_tax_zone {
            if let Some(zone) = zones.iter().find(|z| z.id == zone_id) {
                return Some(zone.clone());
            }
        }
        if let Some(country) = &channel.country {
            if let Some(zone) = zones.iter().find(|z| z.contains_country(country)) {
                return Some(zone.clone());
            }
        }
        zones.first().cloned()
    }
}

/// A configured tax rate for a (zone, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub zone: ZoneId,
    pub category: TaxCategoryId,
    pub name: String,
    /// Rate in basis points.
    pub value: i64,
}

impl TaxRate {
    pub fn new(
        zone: ZoneId,
        category: TaxCategoryId,
        name: impl Into<String>,
        value: i64,
    ) -> Self {
        Self {
            zone,
            category,
            name: name.into(),
            value,
        }
    }

    /// Tax payable on a tax-exclusive price.
    pub fn tax_payable(&self, price: i64) -> i64 {
        round_half_up(price * self.value, BASIS_POINTS)
    }

    /// The tax portion included in a tax-inclusive price.
    pub fn included_tax(&self, gross: i64) -> i64 {
        let net = round_half_up(gross * BASIS_POINTS, BASIS_POINTS + self.value);
        gross - net
    }

    /// Materialize a TAX adjustment for a tax-exclusive price.
    pub fn apply(&self, price: i64) -> Adjustment {
        Adjustment::tax(self.name.clone(), self.tax_payable(price))
    }
}

/// Resolved tax rates, pre-loaded by the out-of-scope administration layer.
#[derive(Debug, Default, Clone)]
pub struct TaxRateRegistry {
    rates: Vec<TaxRate>,
}

impl TaxRateRegistry {
    pub fn new(rates: Vec<TaxRate>) -> Self {
        Self { rates }
    }

    /// The applicable rate for a (zone, category) pair.
    pub fn applicable_rate(
        &self,
        zone: ZoneId,
        category: TaxCategoryId,
    ) -> PricingResult<&TaxRate> {
        self.rates
            .iter()
            .find(|r| r.zone == zone && r.category == category)
            .ok_or(PricingError::MissingTaxRate { category, zone })
    }
}

/// Decides whether entered prices include tax for this request.
pub trait PriceInclusivityStrategy: Send + Sync {
    fn prices_include_tax(&self, ctx: &RequestContext) -> bool;
}

/// Default strategy: follow the channel's configuration.
#[derive(Debug, Default, Clone)]
pub struct ChannelInclusivity;

impl PriceInclusivityStrategy for ChannelInclusivity {
    fn prices_include_tax(&self, ctx: &RequestContext) -> bool {
        ctx.channel().prices_include_tax
    }
}

/// Tax-inclusive/exclusive breakdown of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxCalculation {
    /// The price as entered.
    pub price: i64,
    pub price_includes_tax: bool,
    pub price_with_tax: i64,
    pub price_without_tax: i64,
}

/// Pure tax computation over integer minor units.
///
/// Rounding happens once, when an adjustment amount is materialized, half
/// away from zero.
pub struct TaxCalculator {
    rates: Arc<TaxRateRegistry>,
    inclusivity: Arc<dyn PriceInclusivityStrategy>,
}

impl TaxCalculator {
    pub fn new(
        rates: Arc<TaxRateRegistry>,
        inclusivity: Arc<dyn PriceInclusivityStrategy>,
    ) -> Self {
        Self { rates, inclusivity }
    }

    pub fn calculate(
        &self,
        unit_price: i64,
        category: TaxCategoryId,
        zone: &Zone,
        ctx: &RequestContext,
    ) -> PricingResult<TaxCalculation> {
        let rate = self.rates.applicable_rate(zone.id, category)?;
        if self.inclusivity.prices_include_tax(ctx) {
            Ok(TaxCalculation {
                price: unit_price,
                price_includes_tax: true,
                price_with_tax: unit_price,
                price_without_tax: unit_price - rate.included_tax(unit_price),
            })
        } else {
            Ok(TaxCalculation {
                price: unit_price,
                price_includes_tax: false,
                price_with_tax: unit_price + rate.tax_payable(unit_price),
                price_without_tax: unit_price,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tradewind_core::CurrencyCode;

    fn zone_and_rate(value: i64) -> (Zone, TaxCategoryId, TaxRateRegistry) {
        let zone = Zone::new("Europe", ["GB", "DE", "FR"]);
        let category = TaxCategoryId::new();
        let registry = TaxRateRegistry::new(vec![TaxRate::new(
            zone.id,
            category,
            "Standard Tax Europe",
            value,
        )]);
        (zone, category, registry)
    }

    fn ctx(prices_include_tax: bool) -> RequestContext {
        let channel = Channel::new("storefront", CurrencyCode::new("GBP"))
            .with_prices_include_tax(prices_include_tax);
        RequestContext::new(channel)
    }

    #[test]
    fn exclusive_prices_gain_tax() {
        let (zone, category, registry) = zone_and_rate(2000);
        let calculator = TaxCalculator::new(Arc::new(registry), Arc::new(ChannelInclusivity));
        let result = calculator.calculate(1000, category, &zone, &ctx(false)).unwrap();
        assert_eq!(
            result,
            TaxCalculation {
                price: 1000,
                price_includes_tax: false,
                price_with_tax: 1200,
                price_without_tax: 1000,
            }
        );
    }

    #[test]
    fn inclusive_prices_back_out_tax() {
        let (zone, category, registry) = zone_and_rate(2000);
        let calculator = TaxCalculator::new(Arc::new(registry), Arc::new(ChannelInclusivity));
        let result = calculator.calculate(1200, category, &zone, &ctx(true)).unwrap();
        assert_eq!(
            result,
            TaxCalculation {
                price: 1200,
                price_includes_tax: true,
                price_with_tax: 1200,
                price_without_tax: 1000,
            }
        );
    }

    #[test]
    fn missing_rate_is_an_error() {
        let (zone, _, registry) = zone_and_rate(2000);
        let other_category = TaxCategoryId::new();
        let err = registry.applicable_rate(zone.id, other_category).unwrap_err();
        assert_eq!(
            err,
            PricingError::MissingTaxRate {
                category: other_category,
                zone: zone.id,
            }
        );
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let (zone, category, registry) = zone_and_rate(1750);
        let rate = registry.applicable_rate(zone.id, category).unwrap();
        // 17.5% of 999 = 174.825 -> 175
        assert_eq!(rate.tax_payable(999), 175);
        // 17.5% of 2 = 0.35 -> 0
        assert_eq!(rate.tax_payable(2), 0);
    }

    #[test]
    fn default_strategy_prefers_channel_zone_then_country() {
        let europe = Zone::new("Europe", ["GB", "DE"]);
        let americas = Zone::new("Americas", ["US", "CA"]);
        let zones = vec![europe.clone(), americas.clone()];
        let order = Order::new(CurrencyCode::new("USD"));
        let strategy = DefaultTaxZoneStrategy;

        let channel = Channel::new("us", CurrencyCode::new("USD"))
            .with_default_tax_zone(americas.id);
        assert_eq!(
            strategy.determine_tax_zone(&zones, &channel, &order),
            Some(americas.clone())
        );

        let channel = Channel::new("de", CurrencyCode::new("EUR")).with_country("DE");
        assert_eq!(
            strategy.determine_tax_zone(&zones, &channel, &order),
            Some(europe.clone())
        );

        let channel = Channel::new("other", CurrencyCode::new("JPY"));
        assert_eq!(
            strategy.determine_tax_zone(&zones, &channel, &order),
            Some(europe)
        );

        assert_eq!(strategy.determine_tax_zone(&[], &channel, &order), None);
    }

    proptest! {
        // Backing tax out of a gross price and adding it onto the net never
        // drifts by more than a single rounding step.
        #[test]
        fn included_tax_is_consistent_with_payable(
            gross in 1i64..10_000_000,
            value in 1i64..5_000,
        ) {
            let zone = ZoneId::new();
            let rate = TaxRate::new(zone, TaxCategoryId::new(), "t", value);
            let included = rate.included_tax(gross);
            prop_assert!(included >= 0);
            prop_assert!(included < gross);
            let net = gross - included;
            let rebuilt = net + rate.tax_payable(net);
            prop_assert!((rebuilt - gross).abs() <= 1);
        }
    }
}
