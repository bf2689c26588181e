//! Order operations service.
//!
//! Each mutating operation resolves the caller's order, applies the change,
//! re-runs the full pricing pipeline, and persists only if the pipeline
//! completed. Lifecycle changes go through the state machine and carry the
//! session side effects with them.

use std::sync::Arc;

use chrono::Utc;

use tradewind_auth::{require_owner, AuthService, RequestContext};
use tradewind_core::{Customer, DomainError, OrderLineId, ShippingMethodId, VariantId};
use tradewind_orders::{Order, OrderState, OrderStateMachine};
use tradewind_pricing::{OrderCalculator, PromotionSource, ShippingCalculator, ShippingQuote};

use crate::catalog::ProductCatalog;
use crate::config::OrderOptions;
use crate::error::OrderServiceResult;
use crate::repository::OrderRepository;

/// The storefront's order operations.
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    catalog: Arc<dyn ProductCatalog>,
    promotions: Arc<dyn PromotionSource>,
    calculator: Arc<OrderCalculator>,
    shipping_calculator: Arc<ShippingCalculator>,
    state_machine: Arc<OrderStateMachine>,
    auth: AuthService,
    options: OrderOptions,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        catalog: Arc<dyn ProductCatalog>,
        promotions: Arc<dyn PromotionSource>,
        calculator: Arc<OrderCalculator>,
        shipping_calculator: Arc<ShippingCalculator>,
        state_machine: Arc<OrderStateMachine>,
        options: OrderOptions,
    ) -> Self {
        Self {
            repository,
            catalog,
            promotions,
            calculator,
            shipping_calculator,
            state_machine,
            auth: AuthService::new(),
            options,
        }
    }

    /// The order currently bound to the caller's session, if any.
    pub async fn active_order(
        &self,
        ctx: &mut RequestContext,
    ) -> OrderServiceResult<Option<Order>> {
        require_owner(ctx)?;
        self.order_from_context(ctx, false).await
    }

    /// Look an order up by its customer-facing code.
    ///
    /// Fails with the same `Forbidden` shape whether the code does not exist
    /// or exists but is not accessible to the caller, so responses cannot be
    /// used to enumerate valid codes. Guests may access an order within a
    /// configured window after placement; authenticated callers must own it.
    pub async fn order_by_code(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> OrderServiceResult<Order> {
        require_owner(ctx)?;
        if let Some(order) = self.repository.find_one_by_code(code).await {
            let owner_matches = match ctx.active_user_id() {
                Some(user) => order.customer().and_then(|c| c.user) == Some(user),
                None => false,
            };
            let within_anonymous_window = ctx.active_user_id().is_none()
                && order
                    .placed_at()
                    .is_some_and(|placed| Utc::now() - placed < self.options.anonymous_access_window);
            if owner_matches || within_anonymous_window {
                return Ok(order);
            }
        }
        Err(crate::error::OrderServiceError::forbidden())
    }

    /// Add `quantity` units of a variant to the caller's order, creating the
    /// order (and binding it to the session) if none exists yet.
    pub async fn add_item_to_order(
        &self,
        ctx: &mut RequestContext,
        variant: VariantId,
        quantity: usize,
    ) -> OrderServiceResult<Order> {
        let mut order = self.require_order_from_context(ctx).await?;
        ensure_adding_items(&order)?;
        let detail = self
            .catalog
            .variant(variant)
            .ok_or(DomainError::NotFound)?;
        order.add_item(detail.id, detail.unit_price, detail.tax_category, quantity)?;
        self.apply_adjustments_and_save(ctx, order).await
    }

    /// Set the quantity of an existing line.
    pub async fn adjust_order_line(
        &self,
        ctx: &mut RequestContext,
        line: OrderLineId,
        quantity: usize,
    ) -> OrderServiceResult<Order> {
        let mut order = self.require_order_from_context(ctx).await?;
        ensure_adding_items(&order)?;
        order.adjust_line_quantity(line, quantity)?;
        self.apply_adjustments_and_save(ctx, order).await
    }

    /// Remove a line from the caller's order.
    pub async fn remove_order_line(
        &self,
        ctx: &mut RequestContext,
        line: OrderLineId,
    ) -> OrderServiceResult<Order> {
        let mut order = self.require_order_from_context(ctx).await?;
        ensure_adding_items(&order)?;
        order.remove_line(line)?;
        self.apply_adjustments_and_save(ctx, order).await
    }

    /// Quotes for every shipping method currently eligible for the caller's
    /// order.
    pub async fn eligible_shipping_methods(
        &self,
        ctx: &mut RequestContext,
    ) -> OrderServiceResult<Vec<ShippingQuote>> {
        require_owner(ctx)?;
        match self.order_from_context(ctx, false).await? {
            Some(order) => Ok(self
                .shipping_calculator
                .get_eligible_shipping_methods(ctx, &order)
                .await),
            None => Ok(Vec::new()),
        }
    }

    /// Select a shipping method; the pipeline re-quotes its price.
    pub async fn set_shipping_method(
        &self,
        ctx: &mut RequestContext,
        method: ShippingMethodId,
    ) -> OrderServiceResult<Option<Order>> {
        require_owner(ctx)?;
        let Some(mut order) = self.order_from_context(ctx, false).await? else {
            return Ok(None);
        };
        order.select_shipping_method(method);
        self.apply_adjustments_and_save(ctx, order).await.map(Some)
    }

    /// Attach a resolved customer to the caller's order.
    pub async fn set_customer_for_order(
        &self,
        ctx: &mut RequestContext,
        customer: Customer,
    ) -> OrderServiceResult<Option<Order>> {
        require_owner(ctx)?;
        let Some(mut order) = self.order_from_context(ctx, false).await? else {
            return Ok(None);
        };
        order.set_customer(customer);
        self.repository.save(&mut order).await?;
        Ok(Some(order))
    }

    /// States the caller's order can legally move to right now.
    pub async fn next_order_states(
        &self,
        ctx: &mut RequestContext,
    ) -> OrderServiceResult<Vec<OrderState>> {
        require_owner(ctx)?;
        let order = self.require_order_from_context(ctx).await?;
        Ok(self.state_machine.next_states(&order))
    }

    /// Move the caller's order to `target`.
    ///
    /// An illegal transition fails without side effects. When the order
    /// leaves the active phase, the session's active-order binding is
    /// released before the order is persisted.
    pub async fn transition_order_to_state(
        &self,
        ctx: &mut RequestContext,
        target: OrderState,
    ) -> OrderServiceResult<Order> {
        require_owner(ctx)?;
        let mut order = self.require_order_from_context(ctx).await?;
        self.state_machine.transition(&mut order, target)?;
        if !order.is_active() {
            if let Some(session) = ctx.session_mut() {
                if session.active_order() == Some(order.id_typed()) {
                    self.auth.unset_active_order(session);
                }
            }
        }
        self.repository.save(&mut order).await?;
        Ok(order)
    }

    /// Resolve the caller's order: the session binding first, then the
    /// user's most recent active order, then (optionally) a fresh one.
    /// Whatever is resolved gets bound to the session.
    async fn order_from_context(
        &self,
        ctx: &mut RequestContext,
        create_if_absent: bool,
    ) -> OrderServiceResult<Option<Order>> {
        let bound_order = ctx
            .session()
            .ok_or_else(|| DomainError::internal("no active session"))?
            .active_order();

        let mut order = match bound_order {
            Some(id) => self.repository.find_one(id).await,
            None => None,
        };
        if order.is_some() {
            return Ok(order);
        }

        if let Some(user) = ctx.active_user_id() {
            order = self.repository.find_active_for_user(user).await;
        }
        if order.is_none() && create_if_absent {
            let mut created = Order::new(ctx.channel().currency.clone());
            if let Some(user) = ctx.active_user_id() {
                created.set_customer(Customer::for_user(user));
            }
            self.repository.save(&mut created).await?;
            tracing::debug!(order_id = %created.id_typed(), "created order for session");
            order = Some(created);
        }
        if let Some(order) = &order {
            if let Some(session) = ctx.session_mut() {
                self.auth.set_active_order(session, order.id_typed());
            }
        }
        Ok(order)
    }

    async fn require_order_from_context(
        &self,
        ctx: &mut RequestContext,
    ) -> OrderServiceResult<Order> {
        self.order_from_context(ctx, true)
            .await?
            .ok_or_else(|| DomainError::internal("order resolution yielded nothing").into())
    }

    /// Re-run the pricing pipeline and persist.
    ///
    /// A pipeline error returns before `save`: no partially adjusted order
    /// ever reaches the repository.
    async fn apply_adjustments_and_save(
        &self,
        ctx: &RequestContext,
        mut order: Order,
    ) -> OrderServiceResult<Order> {
        let promotions = self.promotions.active_promotions(ctx);
        self.calculator
            .apply_price_adjustments(ctx, &mut order, &promotions)
            .await?;
        self.repository.save(&mut order).await?;
        Ok(order)
    }
}

fn ensure_adding_items(order: &Order) -> Result<(), DomainError> {
    if order.state() != OrderState::AddingItems {
        return Err(DomainError::invariant(
            "order contents can only change in the adding_items state",
        ));
    }
    Ok(())
}
