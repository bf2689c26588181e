//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_newtype {
    ($(#[$doc:meta])* $t:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of an order aggregate.
    OrderId,
    "OrderId"
);
uuid_newtype!(
    /// Identifier of a single order line.
    OrderLineId,
    "OrderLineId"
);
uuid_newtype!(
    /// Identifier of a unit-level order item within a line.
    OrderItemId,
    "OrderItemId"
);
uuid_newtype!(
    /// Identifier of a purchasable product variant.
    VariantId,
    "VariantId"
);
uuid_newtype!(
    /// Identifier of a customer.
    CustomerId,
    "CustomerId"
);
uuid_newtype!(
    /// Identifier of a user (actor identity).
    UserId,
    "UserId"
);
uuid_newtype!(
    /// Identifier of a session.
    SessionId,
    "SessionId"
);
uuid_newtype!(
    /// Identifier of a sales channel (storefront/region partition).
    ChannelId,
    "ChannelId"
);
uuid_newtype!(
    /// Identifier of a geographic zone.
    ZoneId,
    "ZoneId"
);
uuid_newtype!(
    /// Identifier of a tax category.
    TaxCategoryId,
    "TaxCategoryId"
);
uuid_newtype!(
    /// Identifier of a shipping method.
    ShippingMethodId,
    "ShippingMethodId"
);
uuid_newtype!(
    /// Identifier of a promotion.
    PromotionId,
    "PromotionId"
);
