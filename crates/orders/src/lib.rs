//! `tradewind-orders` — the Order aggregate and its lifecycle state machine.
//!
//! The aggregate is a plain mutable object graph: all related data (lines,
//! items, adjustments) is loaded before the pricing pipeline runs, and the
//! pipeline mutates it in place. Lifecycle state changes go through
//! [`OrderStateMachine`] only.

pub mod adjustment;
pub mod order;
pub mod state;

pub use adjustment::{Adjustment, AdjustmentType};
pub use order::{Order, OrderItem, OrderLine};
pub use state::{OrderProcess, OrderState, OrderStateMachine, TransitionGuard};
