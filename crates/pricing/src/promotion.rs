//! Promotion model: applicability predicates and discount actions.
//!
//! Promotions arrive already filtered to the active channel and time window
//! by an external resolver, and are applied in the order supplied by the
//! caller. There is no internal priority resolution and no conflict
//! detection: every eligible promotion applies, in list order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tradewind_auth::RequestContext;
use tradewind_core::{round_half_up, PromotionId, VariantId};
use tradewind_orders::{Adjustment, Order, OrderItem, OrderLine};

use crate::tax::BASIS_POINTS;

/// A rule bundle with an applicability predicate and discount actions.
pub trait Promotion: Send + Sync {
    fn id(&self) -> PromotionId;

    fn name(&self) -> &str;

    /// Order-level applicability predicate.
    fn test(&self, order: &Order) -> bool;

    /// Item-level action; `None` when the promotion does not discount items.
    fn apply_to_item(&self, _item: &OrderItem, _line: &OrderLine) -> Option<Adjustment> {
        None
    }

    /// Order-level action; `None` when the promotion does not discount the
    /// order as a whole.
    fn apply_to_order(&self, _order: &Order) -> Option<Adjustment> {
        None
    }
}

/// Supplies the promotions active for a request.
///
/// Implementations resolve channel and time-window applicability; the core
/// receives only promotions that are already live.
pub trait PromotionSource: Send + Sync {
    fn active_promotions(&self, ctx: &RequestContext) -> Vec<Arc<dyn Promotion>>;
}

/// Fixed promotion list, for tests and single-channel deployments.
pub struct StaticPromotions(pub Vec<Arc<dyn Promotion>>);

impl PromotionSource for StaticPromotions {
    fn active_promotions(&self, _ctx: &RequestContext) -> Vec<Arc<dyn Promotion>> {
        self.0.clone()
    }
}

/// The undiscounted tax-inclusive value of one unit of a line.
///
/// Derived from the entered price and the line's applied rate rather than
/// from running adjusted prices, so every pipeline run computes discounts
/// from the same base and re-running the pipeline is a no-op.
fn unit_gross_base(line: &OrderLine) -> i64 {
    if line.price_includes_tax() {
        line.unit_price()
    } else {
        line.unit_price() + round_half_up(line.unit_price() * line.tax_rate(), BASIS_POINTS)
    }
}

/// The undiscounted tax-inclusive value of the whole order.
fn order_gross_base(order: &Order) -> i64 {
    order
        .lines()
        .iter()
        .map(|line| unit_gross_base(line) * line.quantity() as i64)
        .sum()
}

/// Applicability condition of a promotion.
pub trait PromotionCondition: Send + Sync {
    fn check(&self, order: &Order) -> bool;
}

/// Requires the order's undiscounted gross value to reach a threshold.
///
/// Evaluated against entered prices so eligibility does not oscillate
/// between the pipeline's tax and promotion passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MinimumOrderAmount {
    pub amount: i64,
}

impl PromotionCondition for MinimumOrderAmount {
    fn check(&self, order: &Order) -> bool {
        order_gross_base(order) >= self.amount
    }
}

/// Requires the order to contain a minimum quantity of a given variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContainsVariant {
    pub variant: VariantId,
    pub min_quantity: usize,
}

impl PromotionCondition for ContainsVariant {
    fn check(&self, order: &Order) -> bool {
        order
            .lines()
            .iter()
            .filter(|l| l.variant() == self.variant)
            .map(OrderLine::quantity)
            .sum::<usize>()
            >= self.min_quantity
    }
}

/// Item-level discount action. Returns the signed amount to apply per unit.
pub trait PromotionItemAction: Send + Sync {
    fn execute(&self, item: &OrderItem, line: &OrderLine) -> Option<i64>;
}

/// Order-level discount action. Returns the signed amount to apply.
pub trait PromotionOrderAction: Send + Sync {
    fn execute(&self, order: &Order) -> Option<i64>;
}

/// Percentage off each unit's tax-inclusive base price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PercentageItemDiscount {
    pub percentage: i64,
}

impl PromotionItemAction for PercentageItemDiscount {
    fn execute(&self, _item: &OrderItem, line: &OrderLine) -> Option<i64> {
        let amount = round_half_up(unit_gross_base(line) * self.percentage, 100);
        (amount != 0).then_some(-amount)
    }
}

/// Percentage off the order's tax-inclusive base value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PercentageOrderDiscount {
    pub percentage: i64,
}

impl PromotionOrderAction for PercentageOrderDiscount {
    fn execute(&self, order: &Order) -> Option<i64> {
        let amount = round_half_up(order_gross_base(order) * self.percentage, 100);
        (amount != 0).then_some(-amount)
    }
}

/// Fixed amount off the order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixedOrderDiscount {
    pub amount: i64,
}

impl PromotionOrderAction for FixedOrderDiscount {
    fn execute(&self, _order: &Order) -> Option<i64> {
        (self.amount != 0).then_some(-self.amount)
    }
}

/// A concrete promotion: zero or more conditions, zero or more actions.
pub struct PromotionRule {
    id: PromotionId,
    name: String,
    conditions: Vec<Box<dyn PromotionCondition>>,
    item_actions: Vec<Box<dyn PromotionItemAction>>,
    order_actions: Vec<Box<dyn PromotionOrderAction>>,
}

impl PromotionRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PromotionId::new(),
            name: name.into(),
            conditions: Vec::new(),
            item_actions: Vec::new(),
            order_actions: Vec::new(),
        }
    }

    pub fn condition(mut self, condition: impl PromotionCondition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn item_action(mut self, action: impl PromotionItemAction + 'static) -> Self {
        self.item_actions.push(Box::new(action));
        self
    }

    pub fn order_action(mut self, action: impl PromotionOrderAction + 'static) -> Self {
        self.order_actions.push(Box::new(action));
        self
    }
}

impl Promotion for PromotionRule {
    fn id(&self) -> PromotionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, order: &Order) -> bool {
        self.conditions.iter().all(|c| c.check(order))
    }

    fn apply_to_item(&self, item: &OrderItem, line: &OrderLine) -> Option<Adjustment> {
        let amounts: Vec<i64> = self
            .item_actions
            .iter()
            .filter_map(|a| a.execute(item, line))
            .collect();
        if amounts.is_empty() {
            return None;
        }
        Some(Adjustment::promotion(self.name.clone(), amounts.iter().sum()))
    }

    fn apply_to_order(&self, order: &Order) -> Option<Adjustment> {
        let amounts: Vec<i64> = self
            .order_actions
            .iter()
            .filter_map(|a| a.execute(order))
            .collect();
        if amounts.is_empty() {
            return None;
        }
        Some(Adjustment::promotion(self.name.clone(), amounts.iter().sum()))
    }
}
