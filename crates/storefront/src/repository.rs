//! Order persistence contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use tradewind_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion, OrderId, UserId};
use tradewind_orders::{Order, OrderState};

/// Persistence boundary for orders.
///
/// Serialization of concurrent recalculations of the same order happens
/// here: `save` refuses a write based on a stale version.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_one(&self, id: OrderId) -> Option<Order>;

    async fn find_one_by_code(&self, code: &str) -> Option<Order>;

    /// The most recent active, item-adding order belonging to a user.
    async fn find_active_for_user(&self, user: UserId) -> Option<Order>;

    /// Persist the order, bumping its version on success.
    async fn save(&self, order: &mut Order) -> DomainResult<()>;
}

/// In-memory order store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_one(&self, id: OrderId) -> Option<Order> {
        self.orders.read().ok()?.get(&id).cloned()
    }

    async fn find_one_by_code(&self, code: &str) -> Option<Order> {
        self.orders
            .read()
            .ok()?
            .values()
            .find(|o| o.code() == code)
            .cloned()
    }

    async fn find_active_for_user(&self, user: UserId) -> Option<Order> {
        self.orders
            .read()
            .ok()?
            .values()
            .filter(|o| {
                o.is_active()
                    && o.state() == OrderState::AddingItems
                    && o.customer().and_then(|c| c.user) == Some(user)
            })
            .max_by_key(|o| o.version())
            .cloned()
    }

    async fn save(&self, order: &mut Order) -> DomainResult<()> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| DomainError::internal("order store lock poisoned"))?;
        if let Some(existing) = orders.get(&order.id_typed()) {
            ExpectedVersion::Exact(existing.version()).check(order.version())?;
        }
        order.bump_version();
        orders.insert(order.id_typed(), order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewind_core::CurrencyCode;

    #[tokio::test]
    async fn save_bumps_version_and_find_reads_back() {
        let repo = InMemoryOrderRepository::new();
        let mut order = Order::new(CurrencyCode::new("USD"));
        let id = order.id_typed();
        repo.save(&mut order).await.unwrap();
        assert_eq!(order.version(), 1);

        let found = repo.find_one(id).await.unwrap();
        assert_eq!(found, order);
        let by_code = repo.find_one_by_code(order.code()).await.unwrap();
        assert_eq!(by_code.id_typed(), id);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        let mut order = Order::new(CurrencyCode::new("USD"));
        repo.save(&mut order).await.unwrap();

        let mut stale = repo.find_one(order.id_typed()).await.unwrap();
        repo.save(&mut order).await.unwrap();

        let err = repo.save(&mut stale).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
