//! Sessions and the active-order binding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradewind_core::{OrderId, SessionId, UserId};

/// A caller's session.
///
/// `active_order` holds at most one order reference at a time. Only the
/// request currently processing the session may set or clear it, and only
/// through [`AuthService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user: Option<UserId>,
    active_order: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            id: SessionId::new(),
            user: None,
            active_order: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Self::anonymous()
        }
    }

    pub fn active_order(&self) -> Option<OrderId> {
        self.active_order
    }
}

/// The only sanctioned mutator of a session's active-order binding.
#[derive(Debug, Default, Clone)]
pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        Self
    }

    pub fn set_active_order(&self, session: &mut Session, order: OrderId) {
        tracing::debug!(session_id = %session.id, order_id = %order, "binding active order");
        session.active_order = Some(order);
    }

    pub fn unset_active_order(&self, session: &mut Session) {
        if let Some(order) = session.active_order.take() {
            tracing::debug!(session_id = %session.id, order_id = %order, "unbinding active order");
        }
    }
}
