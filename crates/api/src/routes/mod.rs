//! Route handlers, one module per resource.

pub mod carts;
pub mod categories;
pub mod customers;
pub mod discounts;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
