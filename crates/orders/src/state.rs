//! Order lifecycle state machine.
//!
//! States form a finite set with a directed edge set configured externally.
//! No component may assign an order's state directly; every change funnels
//! through [`OrderStateMachine::transition`], which rejects illegal moves
//! without touching the aggregate.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use tradewind_core::{DomainError, DomainResult};

use crate::order::Order;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    AddingItems,
    ArrangingPayment,
    PaymentAuthorized,
    PaymentSettled,
    Cancelled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::AddingItems => "adding_items",
            OrderState::ArrangingPayment => "arranging_payment",
            OrderState::PaymentAuthorized => "payment_authorized",
            OrderState::PaymentSettled => "payment_settled",
            OrderState::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guard condition evaluated before an edge may be taken.
pub type TransitionGuard = Arc<dyn Fn(&Order) -> bool + Send + Sync>;

struct Edge {
    from: OrderState,
    to: OrderState,
    guard: Option<TransitionGuard>,
}

/// Externally configured edge set for the order lifecycle.
pub struct OrderProcess {
    edges: Vec<Edge>,
}

impl OrderProcess {
    /// A process with no edges. Compose with [`Self::transition`] /
    /// [`Self::guarded_transition`].
    pub fn empty() -> Self {
        Self { edges: Vec::new() }
    }

    pub fn transition(mut self, from: OrderState, to: OrderState) -> Self {
        self.edges.push(Edge {
            from,
            to,
            guard: None,
        });
        self
    }

    pub fn guarded_transition(
        mut self,
        from: OrderState,
        to: OrderState,
        guard: impl Fn(&Order) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.edges.push(Edge {
            from,
            to,
            guard: Some(Arc::new(guard)),
        });
        self
    }

    fn edge(&self, from: OrderState, to: OrderState) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    fn edges_from(&self, from: OrderState) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == from)
    }
}

impl Default for OrderProcess {
    /// The standard checkout graph.
    ///
    /// `payment_settled` and `cancelled` are terminal: no outgoing edges.
    fn default() -> Self {
        use OrderState::*;
        Self::empty()
            .guarded_transition(AddingItems, ArrangingPayment, |order| {
                !order.lines().is_empty()
            })
            .transition(AddingItems, Cancelled)
            .transition(ArrangingPayment, AddingItems)
            .transition(ArrangingPayment, PaymentAuthorized)
            .transition(ArrangingPayment, PaymentSettled)
            .transition(ArrangingPayment, Cancelled)
            .transition(PaymentAuthorized, PaymentSettled)
            .transition(PaymentAuthorized, Cancelled)
    }
}

/// Enforces the configured lifecycle graph over [`Order`] aggregates.
pub struct OrderStateMachine {
    process: OrderProcess,
}

impl OrderStateMachine {
    pub fn new(process: OrderProcess) -> Self {
        Self { process }
    }

    /// All states reachable from the order's current state via a single edge
    /// whose guard (if any) currently passes.
    pub fn next_states(&self, order: &Order) -> Vec<OrderState> {
        self.process
            .edges_from(order.state())
            .filter(|e| e.guard.as_ref().is_none_or(|g| g(order)))
            .map(|e| e.to)
            .collect()
    }

    /// Move the order to `target`.
    ///
    /// Fails with [`DomainError::IllegalTransition`] when no edge exists or
    /// the edge's guard rejects; the order is left untouched in that case.
    /// On success the state is assigned and edge side effects run: the order
    /// is stamped as placed on first entry into payment arrangement, and
    /// deactivated once payment settles or the order is cancelled.
    pub fn transition(&self, order: &mut Order, target: OrderState) -> DomainResult<()> {
        let from = order.state();
        let edge = self
            .process
            .edge(from, target)
            .ok_or_else(|| DomainError::illegal_transition(from.as_str(), target.as_str()))?;
        if let Some(guard) = &edge.guard {
            if !guard(order) {
                return Err(DomainError::illegal_transition(
                    from.as_str(),
                    target.as_str(),
                ));
            }
        }

        order.set_state(target);
        tracing::debug!(order_id = %order.id_typed(), %from, to = %target, "order state transition");

        if from == OrderState::AddingItems
            && target == OrderState::ArrangingPayment
            && order.placed_at().is_none()
        {
            order.set_placed_at(Utc::now());
        }
        if matches!(target, OrderState::PaymentSettled | OrderState::Cancelled) {
            order.set_active(false);
        }
        Ok(())
    }
}

impl Default for OrderStateMachine {
    fn default() -> Self {
        Self::new(OrderProcess::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewind_core::{CurrencyCode, TaxCategoryId, VariantId};

    fn machine() -> OrderStateMachine {
        OrderStateMachine::default()
    }

    fn order_with_line() -> Order {
        let mut order = Order::new(CurrencyCode::new("USD"));
        order
            .add_item(VariantId::new(), 1000, TaxCategoryId::new(), 1)
            .unwrap();
        order
    }

    #[test]
    fn illegal_transition_leaves_state_unchanged() {
        let mut order = order_with_line();
        let err = machine()
            .transition(&mut order, OrderState::PaymentSettled)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::IllegalTransition {
                from: "adding_items".into(),
                to: "payment_settled".into(),
            }
        );
        assert_eq!(order.state(), OrderState::AddingItems);
        assert!(order.is_active());
    }

    #[test]
    fn guard_blocks_checkout_of_empty_order() {
        let mut order = Order::new(CurrencyCode::new("USD"));
        let err = machine()
            .transition(&mut order, OrderState::ArrangingPayment)
            .unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));
        assert_eq!(order.state(), OrderState::AddingItems);
    }

    #[test]
    fn next_states_respect_guards() {
        let machine = machine();
        let empty = Order::new(CurrencyCode::new("USD"));
        assert_eq!(machine.next_states(&empty), vec![OrderState::Cancelled]);

        let filled = order_with_line();
        assert_eq!(
            machine.next_states(&filled),
            vec![OrderState::ArrangingPayment, OrderState::Cancelled]
        );
    }

    #[test]
    fn placed_at_is_stamped_on_first_checkout_entry() {
        let mut order = order_with_line();
        assert!(order.placed_at().is_none());
        machine()
            .transition(&mut order, OrderState::ArrangingPayment)
            .unwrap();
        assert!(order.placed_at().is_some());
        let placed = order.placed_at();

        // Bouncing back to adding items keeps the original timestamp.
        machine()
            .transition(&mut order, OrderState::AddingItems)
            .unwrap();
        machine()
            .transition(&mut order, OrderState::ArrangingPayment)
            .unwrap();
        assert_eq!(order.placed_at(), placed);
    }

    #[test]
    fn settling_payment_deactivates_order() {
        let mut order = order_with_line();
        let machine = machine();
        machine
            .transition(&mut order, OrderState::ArrangingPayment)
            .unwrap();
        machine
            .transition(&mut order, OrderState::PaymentAuthorized)
            .unwrap();
        machine
            .transition(&mut order, OrderState::PaymentSettled)
            .unwrap();
        assert!(!order.is_active());
        assert_eq!(order.state(), OrderState::PaymentSettled);
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        let mut order = order_with_line();
        let machine = machine();
        machine
            .transition(&mut order, OrderState::ArrangingPayment)
            .unwrap();
        machine
            .transition(&mut order, OrderState::PaymentSettled)
            .unwrap();
        assert!(machine.next_states(&order).is_empty());

        let mut cancelled = order_with_line();
        machine
            .transition(&mut cancelled, OrderState::Cancelled)
            .unwrap();
        assert!(machine.next_states(&cancelled).is_empty());
        assert!(!cancelled.is_active());
    }
}
