//! Shipping methods, eligibility, and price quotes.

use serde::{Deserialize, Serialize};

use tradewind_auth::RequestContext;
use tradewind_core::ShippingMethodId;
use tradewind_orders::Order;

/// A configured way of shipping an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub code: String,
    pub description: String,
}

impl ShippingMethod {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ShippingMethodId::new(),
            code: code.into(),
            description: description.into(),
        }
    }
}

/// A priced quote for shipping an order with a particular method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingQuote {
    pub method: ShippingMethod,
    pub price: i64,
}

/// Per-method eligibility predicate.
pub trait ShippingEligibilityChecker: Send + Sync {
    fn check(&self, order: &Order) -> bool;
}

/// Per-method price calculation.
pub trait ShippingPriceCalculator: Send + Sync {
    fn calculate(&self, order: &Order) -> i64;
}

/// Always eligible.
#[derive(Debug, Default, Clone)]
pub struct AlwaysEligible;

impl ShippingEligibilityChecker for AlwaysEligible {
    fn check(&self, _order: &Order) -> bool {
        true
    }
}

/// Eligible once the order subtotal reaches a threshold.
#[derive(Debug, Clone, Copy)]
pub struct MinimumSubtotalEligibility {
    pub minimum: i64,
}

impl ShippingEligibilityChecker for MinimumSubtotalEligibility {
    fn check(&self, order: &Order) -> bool {
        order.sub_total() >= self.minimum
    }
}

/// A fixed price regardless of order contents.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateShipping {
    pub rate: i64,
}

impl ShippingPriceCalculator for FlatRateShipping {
    fn calculate(&self, _order: &Order) -> i64 {
        self.rate
    }
}

struct ConfiguredMethod {
    method: ShippingMethod,
    checker: Box<dyn ShippingEligibilityChecker>,
    calculator: Box<dyn ShippingPriceCalculator>,
}

/// Quotes eligible shipping methods for an order.
///
/// Methods are evaluated and returned in configured order; ranking beyond
/// that is the configuration's concern. The quote query is the pipeline's
/// async suspension point (real deployments price against carriers).
#[derive(Default)]
pub struct ShippingCalculator {
    methods: Vec<ConfiguredMethod>,
}

impl ShippingCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(
        mut self,
        method: ShippingMethod,
        checker: impl ShippingEligibilityChecker + 'static,
        calculator: impl ShippingPriceCalculator + 'static,
    ) -> Self {
        self.methods.push(ConfiguredMethod {
            method,
            checker: Box::new(checker),
            calculator: Box::new(calculator),
        });
        self
    }

    pub async fn get_eligible_shipping_methods(
        &self,
        _ctx: &RequestContext,
        order: &Order,
    ) -> Vec<ShippingQuote> {
        self.methods
            .iter()
            .filter(|m| m.checker.check(order))
            .map(|m| ShippingQuote {
                method: m.method.clone(),
                price: m.calculator.calculate(order),
            })
            .collect()
    }
}
