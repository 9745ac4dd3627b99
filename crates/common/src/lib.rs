//! Shared types used across the storefront workspace.

pub mod ids;
pub mod money;

pub use ids::{
    CartId, CartItemId, CategoryId, CommentId, CustomerId, DiscountId, OrderId, OrderItemId,
    ProductId,
};
pub use money::Money;
