//! `tradewind-pricing` — taxes, promotions, shipping quotes, and the order
//! calculator that sequences them.
//!
//! The pipeline is order-sensitive: tax depends on price, promotions alter
//! price, and tax is recomputed against the discounted price. Running it
//! again with the same inputs must produce identical adjustments and totals.

pub mod calculator;
pub mod error;
pub mod promotion;
pub mod shipping;
pub mod tax;

pub use calculator::OrderCalculator;
pub use error::{PricingError, PricingResult};
pub use promotion::{
    ContainsVariant, FixedOrderDiscount, MinimumOrderAmount, PercentageItemDiscount,
    PercentageOrderDiscount, Promotion, PromotionCondition, PromotionItemAction,
    PromotionOrderAction, PromotionRule, PromotionSource, StaticPromotions,
};
pub use shipping::{
    AlwaysEligible, FlatRateShipping, MinimumSubtotalEligibility, ShippingCalculator,
    ShippingEligibilityChecker, ShippingMethod, ShippingPriceCalculator, ShippingQuote,
};
pub use tax::{
    ChannelInclusivity, DefaultTaxZoneStrategy, PriceInclusivityStrategy, StaticZones,
    TaxCalculation, TaxCalculator, TaxRate, TaxRateRegistry, TaxZoneStrategy, Zone, ZoneProvider,
};
