//! Customer reference.

use serde::{Deserialize, Serialize};

use crate::id::{CustomerId, UserId};

/// Reference to a customer, resolved by the out-of-scope customer service
/// and loaded explicitly before the core operates on an order.
///
/// `user` is the authenticated identity backing the customer, when one
/// exists; guest customers have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user: Option<UserId>,
}

impl Customer {
    pub fn guest() -> Self {
        Self {
            id: CustomerId::new(),
            user: None,
        }
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            id: CustomerId::new(),
            user: Some(user),
        }
    }
}
