//! Storefront error model.

use thiserror::Error;

use tradewind_auth::AuthzError;
use tradewind_core::DomainError;
use tradewind_pricing::PricingError;

pub type OrderServiceResult<T> = Result<T, OrderServiceError>;

/// Error surfaced by order operations.
///
/// No retries happen here; the caller decides user-visible presentation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl From<AuthzError> for OrderServiceError {
    fn from(_: AuthzError) -> Self {
        Self::Domain(DomainError::Forbidden)
    }
}

impl OrderServiceError {
    pub fn forbidden() -> Self {
        Self::Domain(DomainError::Forbidden)
    }
}
