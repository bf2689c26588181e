//! Product catalog boundary.

use std::collections::HashMap;

use tradewind_core::{TaxCategoryId, VariantId};

/// What the core needs to know about a purchasable variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantDetail {
    pub id: VariantId,
    /// Price as entered by the merchant, in smallest currency unit.
    pub unit_price: i64,
    pub tax_category: TaxCategoryId,
}

/// Resolves variant data. Implemented by the out-of-scope product service;
/// all data is loaded before the pipeline runs.
pub trait ProductCatalog: Send + Sync {
    fn variant(&self, id: VariantId) -> Option<VariantDetail>;
}

/// Fixed catalog for tests and seed data.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    variants: HashMap<VariantId, VariantDetail>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, detail: VariantDetail) -> Self {
        self.variants.insert(detail.id, detail);
        self
    }
}

impl ProductCatalog for StaticCatalog {
    fn variant(&self, id: VariantId) -> Option<VariantDetail> {
        self.variants.get(&id).copied()
    }
}
