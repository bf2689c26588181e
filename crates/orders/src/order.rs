//! The mutable Order aggregate: order, lines, unit-level items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradewind_core::{
    round_half_up, AggregateRoot, CurrencyCode, Customer, DomainError, DomainResult, OrderId,
    OrderItemId, OrderLineId, ShippingMethodId, TaxCategoryId, VariantId,
};

use crate::adjustment::{Adjustment, AdjustmentType};
use crate::state::OrderState;

/// Scale factor for tax rates expressed in basis points (20% == 2000).
pub(crate) const BASIS_POINTS: i64 = 10_000;

/// A single purchasable unit within an order line.
///
/// Pending adjustments are append-only within a pipeline pass and cleared
/// per-type at the start of the pass that owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    /// Price as entered, in smallest currency unit.
    unit_price: i64,
    pending_adjustments: Vec<Adjustment>,
}

impl OrderItem {
    fn new(unit_price: i64) -> Self {
        Self {
            id: OrderItemId::new(),
            unit_price,
            pending_adjustments: Vec::new(),
        }
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn pending_adjustments(&self) -> &[Adjustment] {
        &self.pending_adjustments
    }

    pub fn add_adjustment(&mut self, adjustment: Adjustment) {
        self.pending_adjustments.push(adjustment);
    }

    pub fn clear_adjustments(&mut self, kind: AdjustmentType) {
        self.pending_adjustments.retain(|a| a.kind != kind);
    }

    fn total_of(&self, kind: AdjustmentType) -> i64 {
        self.pending_adjustments
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.amount)
            .sum()
    }

    pub fn promotions_total(&self) -> i64 {
        self.total_of(AdjustmentType::Promotion)
    }

    pub fn tax_total(&self) -> i64 {
        self.total_of(AdjustmentType::Tax)
    }

    /// The unit price after promotion adjustments, before tax adjustments.
    /// This is the taxable base for tax-exclusive pricing.
    pub fn unit_price_with_promotions(&self) -> i64 {
        self.unit_price + self.promotions_total()
    }

    /// The final per-unit price: entered price plus all pending adjustments.
    pub fn final_price(&self) -> i64 {
        let adjustments: i64 = self.pending_adjustments.iter().map(|a| a.amount).sum();
        self.unit_price + adjustments
    }
}

/// A distinct purchasable line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    id: OrderLineId,
    variant: VariantId,
    /// Price as entered, in smallest currency unit.
    unit_price: i64,
    tax_category: TaxCategoryId,
    /// Applied tax rate in basis points; set by the pricing pipeline.
    tax_rate: i64,
    price_includes_tax: bool,
    items: Vec<OrderItem>,
}

impl OrderLine {
    fn new(variant: VariantId, unit_price: i64, tax_category: TaxCategoryId, quantity: usize) -> Self {
        let items = (0..quantity).map(|_| OrderItem::new(unit_price)).collect();
        Self {
            id: OrderLineId::new(),
            variant,
            unit_price,
            tax_category,
            tax_rate: 0,
            price_includes_tax: false,
            items,
        }
    }

    pub fn id(&self) -> OrderLineId {
        self.id
    }

    pub fn variant(&self) -> VariantId {
        self.variant
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn tax_category(&self) -> TaxCategoryId {
        self.tax_category
    }

    pub fn tax_rate(&self) -> i64 {
        self.tax_rate
    }

    pub fn price_includes_tax(&self) -> bool {
        self.price_includes_tax
    }

    pub fn quantity(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [OrderItem] {
        &mut self.items
    }

    pub fn set_tax_rate(&mut self, basis_points: i64) {
        self.tax_rate = basis_points;
    }

    pub fn set_unit_price_includes_tax(&mut self, includes_tax: bool) {
        self.price_includes_tax = includes_tax;
    }

    fn set_quantity(&mut self, quantity: usize) {
        while self.items.len() > quantity {
            self.items.pop();
        }
        while self.items.len() < quantity {
            self.items.push(OrderItem::new(self.unit_price));
        }
    }

    pub fn clear_adjustments(&mut self, kind: AdjustmentType) {
        for item in &mut self.items {
            item.clear_adjustments(kind);
        }
    }

    /// Line total: sum of the final prices of all items in the line.
    pub fn total_price(&self) -> i64 {
        self.items.iter().map(OrderItem::final_price).sum()
    }

    /// Tax carried by this line.
    ///
    /// For tax-exclusive prices this is the sum of the items' TAX adjustments.
    /// For tax-inclusive prices no TAX adjustments exist; the included portion
    /// is backed out of each item's discounted price using the applied rate.
    pub fn line_tax(&self) -> i64 {
        if self.price_includes_tax {
            self.items
                .iter()
                .map(|item| {
                    let gross = item.unit_price_with_promotions();
                    let net = round_half_up(gross * BASIS_POINTS, BASIS_POINTS + self.tax_rate);
                    gross - net
                })
                .sum()
        } else {
            self.items.iter().map(OrderItem::tax_total).sum()
        }
    }
}

/// Aggregate root: a customer's in-progress or completed purchase.
///
/// Owned exclusively by the request that holds it during a pipeline run.
/// Lifecycle state changes only through [`crate::OrderStateMachine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    /// Customer-facing lookup code.
    code: String,
    state: OrderState,
    /// True from creation until payment settles or the order is cancelled.
    active: bool,
    currency: CurrencyCode,
    lines: Vec<OrderLine>,
    /// Order-level adjustments (e.g. whole-order promotions).
    adjustments: Vec<Adjustment>,
    shipping_method: Option<ShippingMethodId>,
    shipping: i64,
    customer: Option<Customer>,
    placed_at: Option<DateTime<Utc>>,
    sub_total: i64,
    sub_total_before_tax: i64,
    version: u64,
}

impl Order {
    /// Create an empty order in the item-adding state.
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            id: OrderId::new(),
            code: generate_order_code(),
            state: OrderState::AddingItems,
            active: true,
            currency,
            lines: Vec::new(),
            adjustments: Vec::new(),
            shipping_method: None,
            shipping: 0,
            customer: None,
            placed_at: None,
            sub_total: 0,
            sub_total_before_tax: 0,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [OrderLine] {
        &mut self.lines
    }

    pub fn line(&self, id: OrderLineId) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn set_customer(&mut self, customer: Customer) {
        self.customer = Some(customer);
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn shipping_method(&self) -> Option<ShippingMethodId> {
        self.shipping_method
    }

    pub fn shipping(&self) -> i64 {
        self.shipping
    }

    pub fn set_shipping(&mut self, method: ShippingMethodId, price: i64) {
        self.shipping_method = Some(method);
        self.shipping = price;
    }

    /// Select a shipping method, keeping the current price until the pricing
    /// pipeline quotes it.
    pub fn select_shipping_method(&mut self, method: ShippingMethodId) {
        self.shipping_method = Some(method);
    }

    pub fn sub_total(&self) -> i64 {
        self.sub_total
    }

    pub fn sub_total_before_tax(&self) -> i64 {
        self.sub_total_before_tax
    }

    /// Grand total: line subtotal, order-level adjustments, shipping.
    pub fn total(&self) -> i64 {
        self.sub_total + self.adjustments_total() + self.shipping
    }

    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    pub fn adjustments_total(&self) -> i64 {
        self.adjustments.iter().map(|a| a.amount).sum()
    }

    pub fn add_adjustment(&mut self, adjustment: Adjustment) {
        self.adjustments.push(adjustment);
    }

    /// Drop all order-level adjustments. Run at the start of a pipeline pass.
    pub fn clear_adjustments(&mut self) {
        self.adjustments.clear();
    }

    /// Add `quantity` units of a variant.
    ///
    /// An existing line for the same variant grows instead of duplicating.
    /// Returns the id of the affected line.
    pub fn add_item(
        &mut self,
        variant: VariantId,
        unit_price: i64,
        tax_category: TaxCategoryId,
        quantity: usize,
    ) -> DomainResult<OrderLineId> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.variant == variant) {
            let current = line.quantity();
            line.set_quantity(current + quantity);
            return Ok(line.id);
        }
        let line = OrderLine::new(variant, unit_price, tax_category, quantity);
        let id = line.id;
        self.lines.push(line);
        Ok(id)
    }

    /// Set the quantity of an existing line.
    pub fn adjust_line_quantity(
        &mut self,
        line_id: OrderLineId,
        quantity: usize,
    ) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::NotFound)?;
        line.set_quantity(quantity);
        Ok(())
    }

    /// Remove a line entirely.
    pub fn remove_line(&mut self, line_id: OrderLineId) -> DomainResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        if self.lines.len() == before {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    /// Recompute derived totals from the line graph.
    ///
    /// Pure over the aggregate's own data; must be re-run after every
    /// structural mutation, never accumulated incrementally. Orders without
    /// lines have zero totals and no shipping charge.
    pub fn recalculate_totals(&mut self) {
        if self.lines.is_empty() {
            self.sub_total = 0;
            self.sub_total_before_tax = 0;
            self.shipping = 0;
            self.shipping_method = None;
            return;
        }
        let total_price: i64 = self.lines.iter().map(OrderLine::total_price).sum();
        let total_tax: i64 = self.lines.iter().map(OrderLine::line_tax).sum();
        self.sub_total = total_price;
        self.sub_total_before_tax = total_price - total_tax;
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn set_state(&mut self, state: OrderState) {
        self.state = state;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_placed_at(&mut self, at: DateTime<Utc>) {
        self.placed_at = Some(at);
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Customer-facing order code: 16 uppercase hex chars drawn from the random
/// portion of a UUIDv7.
fn generate_order_code() -> String {
    let simple = Uuid::now_v7().simple().to_string();
    simple[16..].to_uppercase()
}
