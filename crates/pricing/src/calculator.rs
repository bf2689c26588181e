//! The order calculator: sequences taxes, promotions, and shipping over an
//! order and recomputes its totals.

use std::sync::Arc;

use tradewind_auth::RequestContext;
use tradewind_orders::{AdjustmentType, Order};

use crate::error::PricingResult;
use crate::promotion::Promotion;
use crate::shipping::ShippingCalculator;
use crate::tax::{TaxCalculator, TaxRateRegistry, TaxZoneStrategy, Zone, ZoneProvider};

/// Orchestrates the price-adjustment pipeline.
///
/// The pass order is fixed: taxes against entered prices, then promotions,
/// then taxes again (promotions change the taxable price), then shipping.
/// Every pass clears the adjustments it owns before applying, so re-running
/// the pipeline against the same inputs is a no-op.
pub struct OrderCalculator {
    zones: Arc<dyn ZoneProvider>,
    zone_strategy: Arc<dyn TaxZoneStrategy>,
    tax_rates: Arc<TaxRateRegistry>,
    tax_calculator: TaxCalculator,
    shipping_calculator: Arc<ShippingCalculator>,
}

impl OrderCalculator {
    pub fn new(
        zones: Arc<dyn ZoneProvider>,
        zone_strategy: Arc<dyn TaxZoneStrategy>,
        tax_rates: Arc<TaxRateRegistry>,
        tax_calculator: TaxCalculator,
        shipping_calculator: Arc<ShippingCalculator>,
    ) -> Self {
        Self {
            zones,
            zone_strategy,
            tax_rates,
            tax_calculator,
            shipping_calculator,
        }
    }

    /// Applies taxes and promotions to an order. Mutates the order in place.
    ///
    /// Any error leaves the order mid-recalculation; the caller must discard
    /// it rather than persist.
    pub async fn apply_price_adjustments(
        &self,
        ctx: &RequestContext,
        order: &mut Order,
        promotions: &[Arc<dyn Promotion>],
    ) -> PricingResult<()> {
        let zones = self.zones.find_all(ctx);
        let active_zone = self
            .zone_strategy
            .determine_tax_zone(&zones, ctx.channel(), order)
            .ok_or(crate::error::PricingError::NoActiveTaxZone)?;
        tracing::debug!(
            order_id = %order.id_typed(),
            zone = %active_zone.name,
            promotions = promotions.len(),
            "applying price adjustments"
        );

        order.clear_adjustments();
        if order.lines().is_empty() {
            order.recalculate_totals();
            return Ok(());
        }

        // First apply taxes to the non-discounted prices.
        self.apply_taxes(ctx, order, &active_zone)?;
        // Then test and apply promotions.
        self.apply_promotions(order, promotions);
        // Re-calculate taxes: promotions may have altered the unit prices,
        // which in turn alters the tax payable.
        self.apply_taxes(ctx, order, &active_zone)?;
        self.apply_shipping(ctx, order).await;
        order.recalculate_totals();
        Ok(())
    }

    /// Applies the correct tax rate to each item in the order.
    fn apply_taxes(
        &self,
        ctx: &RequestContext,
        order: &mut Order,
        active_zone: &Zone,
    ) -> PricingResult<()> {
        for i in 0..order.lines().len() {
            let (unit_price, category) = {
                let line = &order.lines()[i];
                (line.unit_price(), line.tax_category())
            };
            let rate = self
                .tax_rates
                .applicable_rate(active_zone.id, category)?
                .clone();
            let calculation =
                self.tax_calculator
                    .calculate(unit_price, category, active_zone, ctx)?;

            let line = &mut order.lines_mut()[i];
            line.clear_adjustments(AdjustmentType::Tax);
            line.set_unit_price_includes_tax(calculation.price_includes_tax);
            line.set_tax_rate(rate.value);

            if !calculation.price_includes_tax {
                for item in line.items_mut() {
                    let adjustment = rate.apply(item.unit_price_with_promotions());
                    item.add_adjustment(adjustment);
                }
            }
            order.recalculate_totals();
        }
        Ok(())
    }

    /// Applies eligible promotions, item-level then order-level, in the
    /// order supplied by the caller.
    fn apply_promotions(&self, order: &mut Order, promotions: &[Arc<dyn Promotion>]) {
        for i in 0..order.lines().len() {
            let applicable: Vec<usize> = promotions
                .iter()
                .enumerate()
                .filter(|(_, p)| p.test(order))
                .map(|(idx, _)| idx)
                .collect();

            order.lines_mut()[i].clear_adjustments(AdjustmentType::Promotion);

            for idx in applicable {
                let promotion = &promotions[idx];
                for item_idx in 0..order.lines()[i].items().len() {
                    let adjustment = {
                        let line = &order.lines()[i];
                        promotion.apply_to_item(&line.items()[item_idx], line)
                    };
                    if let Some(adjustment) = adjustment {
                        order.lines_mut()[i].items_mut()[item_idx].add_adjustment(adjustment);
                    }
                }
                order.recalculate_totals();
            }
        }

        let applicable: Vec<usize> = promotions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.test(order))
            .map(|(idx, _)| idx)
            .collect();
        for idx in applicable {
            if let Some(adjustment) = promotions[idx].apply_to_order(order) {
                order.add_adjustment(adjustment);
            }
        }
        order.recalculate_totals();
    }

    /// Selects a shipping price from the eligible quotes.
    ///
    /// The order's current method wins if it is still eligible; otherwise the
    /// first (externally ranked) quote is taken, and its method recorded so
    /// price and method stay consistent. No quotes leaves shipping untouched.
    async fn apply_shipping(&self, ctx: &RequestContext, order: &mut Order) {
        let quotes = self
            .shipping_calculator
            .get_eligible_shipping_methods(ctx, order)
            .await;
        if quotes.is_empty() {
            return;
        }
        let selected = order
            .shipping_method()
            .and_then(|current| quotes.iter().find(|q| q.method.id == current))
            .unwrap_or(&quotes[0]);
        order.set_shipping(selected.method.id, selected.price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::{
        FixedOrderDiscount, MinimumOrderAmount, PercentageItemDiscount, PromotionRule,
    };
    use crate::shipping::{AlwaysEligible, FlatRateShipping, ShippingMethod};
    use crate::tax::{
        ChannelInclusivity, DefaultTaxZoneStrategy, StaticZones, TaxRate, TaxRateRegistry,
    };
    use tradewind_core::{Channel, CurrencyCode, ShippingMethodId, TaxCategoryId, VariantId};

    struct Fixture {
        calculator: OrderCalculator,
        ctx: RequestContext,
        category: TaxCategoryId,
    }

    fn fixture_with_shipping(shipping: ShippingCalculator) -> Fixture {
        let zone = Zone::new("Europe", ["GB", "DE"]);
        let category = TaxCategoryId::new();
        let rates = Arc::new(TaxRateRegistry::new(vec![TaxRate::new(
            zone.id,
            category,
            "Standard Tax 20%",
            2000,
        )]));
        let channel = Channel::new("storefront", CurrencyCode::new("GBP"))
            .with_default_tax_zone(zone.id);
        let calculator = OrderCalculator::new(
            Arc::new(StaticZones(vec![zone])),
            Arc::new(DefaultTaxZoneStrategy),
            Arc::clone(&rates),
            TaxCalculator::new(rates, Arc::new(ChannelInclusivity)),
            Arc::new(shipping),
        );
        Fixture {
            calculator,
            ctx: RequestContext::new(channel),
            category,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_shipping(ShippingCalculator::new())
    }

    fn ten_percent_off_items() -> Arc<dyn Promotion> {
        Arc::new(
            PromotionRule::new("10% off").item_action(PercentageItemDiscount { percentage: 10 }),
        )
    }

    #[tokio::test]
    async fn tax_only_run_matches_entered_prices() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[])
            .await
            .unwrap();

        assert_eq!(order.sub_total(), 1200);
        assert_eq!(order.sub_total_before_tax(), 1000);
        let line = &order.lines()[0];
        assert_eq!(line.line_tax(), 200);
        assert_eq!(line.tax_rate(), 2000);
        assert!(!line.price_includes_tax());
    }

    #[tokio::test]
    async fn discount_then_retax_recomputes_against_discounted_price() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[ten_percent_off_items()])
            .await
            .unwrap();

        // Discount -120 off the 1200 gross; tax recomputed on the 880 base.
        let line = &order.lines()[0];
        assert_eq!(line.items()[0].promotions_total(), -120);
        assert_eq!(line.items()[0].unit_price_with_promotions(), 880);
        assert_eq!(line.line_tax(), 176);
        assert_eq!(order.sub_total(), 1056);
        assert_eq!(order.sub_total_before_tax(), 880);
    }

    #[tokio::test]
    async fn pipeline_is_idempotent() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 3).unwrap();
        let promotions = vec![ten_percent_off_items()];

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &promotions)
            .await
            .unwrap();
        let first = order.clone();

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &promotions)
            .await
            .unwrap();

        assert_eq!(order, first);
    }

    #[tokio::test]
    async fn never_applicable_promotion_is_a_no_op() {
        let f = fixture();
        let mut plain = Order::new(CurrencyCode::new("GBP"));
        plain.add_item(VariantId::new(), 1000, f.category, 2).unwrap();
        let mut promoted = plain.clone();

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut plain, &[])
            .await
            .unwrap();

        let unreachable: Arc<dyn Promotion> = Arc::new(
            PromotionRule::new("unreachable")
                .condition(MinimumOrderAmount { amount: i64::MAX })
                .item_action(PercentageItemDiscount { percentage: 50 }),
        );
        f.calculator
            .apply_price_adjustments(&f.ctx, &mut promoted, &[unreachable])
            .await
            .unwrap();

        assert_eq!(promoted.sub_total(), plain.sub_total());
        assert_eq!(promoted.sub_total_before_tax(), plain.sub_total_before_tax());
        assert_eq!(promoted.adjustments(), plain.adjustments());
    }

    #[tokio::test]
    async fn order_level_promotion_lands_on_the_order() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();
        let promo: Arc<dyn Promotion> = Arc::new(
            PromotionRule::new("5 off").order_action(FixedOrderDiscount { amount: 500 }),
        );

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[promo])
            .await
            .unwrap();

        assert_eq!(order.adjustments().len(), 1);
        assert_eq!(order.adjustments()[0].amount, -500);
        // Line totals untouched by order-level discount.
        assert_eq!(order.sub_total(), 1200);
        assert_eq!(order.total(), 700);
    }

    #[tokio::test]
    async fn empty_order_has_zero_totals_and_no_adjustments() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_adjustment(tradewind_orders::Adjustment::promotion("stale", -100));

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[ten_percent_off_items()])
            .await
            .unwrap();

        assert_eq!(order.sub_total(), 0);
        assert_eq!(order.sub_total_before_tax(), 0);
        assert_eq!(order.total(), 0);
        assert!(order.adjustments().is_empty());
    }

    #[tokio::test]
    async fn missing_tax_rate_propagates() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        let unconfigured = TaxCategoryId::new();
        order.add_item(VariantId::new(), 1000, unconfigured, 1).unwrap();

        let err = f
            .calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, crate::PricingError::MissingTaxRate { .. }));
    }

    #[tokio::test]
    async fn current_shipping_method_wins_over_cheaper_quotes() {
        let cheap = ShippingMethod::new("standard", "Standard");
        let pricey = ShippingMethod::new("express", "Express");
        let shipping = ShippingCalculator::new()
            .with_method(cheap.clone(), AlwaysEligible, FlatRateShipping { rate: 300 })
            .with_method(pricey.clone(), AlwaysEligible, FlatRateShipping { rate: 900 });
        let f = fixture_with_shipping(shipping);

        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();
        order.set_shipping(pricey.id, 0);

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[])
            .await
            .unwrap();

        assert_eq!(order.shipping_method(), Some(pricey.id));
        assert_eq!(order.shipping(), 900);
    }

    #[tokio::test]
    async fn absent_method_defaults_to_first_quote() {
        let first = ShippingMethod::new("standard", "Standard");
        let second = ShippingMethod::new("economy", "Economy");
        let shipping = ShippingCalculator::new()
            .with_method(first.clone(), AlwaysEligible, FlatRateShipping { rate: 450 })
            .with_method(second, AlwaysEligible, FlatRateShipping { rate: 100 });
        let f = fixture_with_shipping(shipping);

        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[])
            .await
            .unwrap();

        assert_eq!(order.shipping_method(), Some(first.id));
        assert_eq!(order.shipping(), 450);
        assert_eq!(order.total(), 1200 + 450);
    }

    #[tokio::test]
    async fn no_quotes_leaves_shipping_untouched() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 1000, f.category, 1).unwrap();
        let method = ShippingMethodId::new();
        order.set_shipping(method, 250);

        f.calculator
            .apply_price_adjustments(&f.ctx, &mut order, &[])
            .await
            .unwrap();

        assert_eq!(order.shipping_method(), Some(method));
        assert_eq!(order.shipping(), 250);
    }

    #[tokio::test]
    async fn totals_invariant_holds_after_every_run() {
        let f = fixture();
        let mut order = Order::new(CurrencyCode::new("GBP"));
        order.add_item(VariantId::new(), 999, f.category, 3).unwrap();
        order.add_item(VariantId::new(), 12_345, f.category, 2).unwrap();
        let promotions = vec![ten_percent_off_items()];

        for _ in 0..3 {
            f.calculator
                .apply_price_adjustments(&f.ctx, &mut order, &promotions)
                .await
                .unwrap();
            let line_tax: i64 = order.lines().iter().map(|l| l.line_tax()).sum();
            assert_eq!(order.sub_total_before_tax() + line_tax, order.sub_total());
        }
    }
}
