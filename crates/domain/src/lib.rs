//! Domain layer for the storefront.
//!
//! One service per aggregate, each generic over the storage ports it needs.
//! All field validation lives here — in particular the checks the system must
//! never allow a write path to bypass (category title length, product name
//! length, positive quantities) — together with the pricing rules: carts
//! price live, orders freeze prices at creation.

pub mod cart;
pub mod catalog;
pub mod customer;
pub mod error;
pub mod moderation;
pub mod order;
pub mod slug;

pub use cart::{CartItemView, CartService, CartView};
pub use catalog::{CatalogService, NewCategory, NewDiscount, NewProduct, UpdateCategory, UpdateProduct};
pub use customer::{CustomerService, NewAddress, NewCustomer};
pub use error::{DomainError, Result};
pub use moderation::{ModerationService, NewComment};
pub use order::{NewOrderItem, OrderService, OrderView};
pub use slug::slugify;
