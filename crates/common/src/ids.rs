//! Typed UUID identifiers.
//!
//! Each entity gets its own newtype so a `CartId` can never be passed where a
//! `ProductId` is expected. All identifiers are random v4 UUIDs generated
//! server-side; clients never choose them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier for a product category.
    CategoryId
);
uuid_id!(
    /// Identifier for a discount.
    DiscountId
);
uuid_id!(
    /// Identifier for a catalog product.
    ProductId
);
uuid_id!(
    /// Identifier for a customer.
    CustomerId
);
uuid_id!(
    /// Identifier for an order.
    OrderId
);
uuid_id!(
    /// Identifier for a line item within an order.
    OrderItemId
);
uuid_id!(
    /// Opaque identifier for a shopping cart.
    CartId
);
uuid_id!(
    /// Identifier for a line item within a cart.
    CartItemId
);
uuid_id!(
    /// Identifier for a product comment.
    CommentId
);
