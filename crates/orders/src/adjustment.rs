//! Signed monetary deltas applied to items and orders.

use serde::{Deserialize, Serialize};

/// Kind of price adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Tax,
    Promotion,
    Shipping,
}

/// A signed monetary delta in minor currency units.
///
/// Amounts are never fractional. Adjustments of a given type are replaced,
/// not accumulated, on each pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub kind: AdjustmentType,
    pub description: String,
    pub amount: i64,
}

impl Adjustment {
    pub fn new(kind: AdjustmentType, description: impl Into<String>, amount: i64) -> Self {
        Self {
            kind,
            description: description.into(),
            amount,
        }
    }

    pub fn tax(description: impl Into<String>, amount: i64) -> Self {
        Self::new(AdjustmentType::Tax, description, amount)
    }

    pub fn promotion(description: impl Into<String>, amount: i64) -> Self {
        Self::new(AdjustmentType::Promotion, description, amount)
    }
}
