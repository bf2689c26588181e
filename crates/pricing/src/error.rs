//! Pricing error model.

use thiserror::Error;

use tradewind_core::{TaxCategoryId, ZoneId};

pub type PricingResult<T> = Result<T, PricingError>;

/// Failure inside the pricing pipeline.
///
/// These propagate uncaught to the caller, which must discard the order
/// rather than persist a partially adjusted one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No tax rate is configured for this category/zone pair.
    #[error("no tax rate configured for category '{category}' in zone '{zone}'")]
    MissingTaxRate {
        category: TaxCategoryId,
        zone: ZoneId,
    },

    /// The zone strategy could not resolve an active tax zone.
    #[error("no active tax zone could be determined")]
    NoActiveTaxZone,
}
