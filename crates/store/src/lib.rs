//! Storage layer for the storefront.
//!
//! Defines the entity records, one storage-port trait per aggregate, and two
//! engines implementing all of them: [`MemoryStore`] (tests, local runs) and
//! [`PostgresStore`] (sqlx). The invariants with a race window — the
//! quantity-merging cart upsert and the guarded deletes — live down here so
//! every engine enforces them atomically.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use query::{Page, ProductFilter, ProductOrder};
pub use records::{
    Address, Cart, CartItem, CartItemWithProduct, Category, Comment, CommentStatus, Customer,
    Discount, Order, OrderItem, OrderStatus, Product, ProductSnapshot,
};
pub use store::{CartStore, CatalogStore, CommentStore, CustomerStore, OrderStore, Store};
