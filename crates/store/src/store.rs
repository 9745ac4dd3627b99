//! Storage-port traits, one per aggregate.
//!
//! Every engine implements all of them over a single connection handle, so a
//! service can take one generic `S` and use whichever ports it needs.

use async_trait::async_trait;

use common::{CartId, CartItemId, CategoryId, CommentId, CustomerId, DiscountId, OrderId, ProductId};

use crate::error::Result;
use crate::query::{Page, ProductFilter};
use crate::records::{
    Address, Cart, CartItem, CartItemWithProduct, Category, Comment, CommentStatus, Customer,
    Discount, Order, OrderItem, OrderStatus, Product,
};

/// Storage port for the catalog aggregate (categories, discounts, products).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_category(&self, category: Category) -> Result<Category>;
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    /// Replaces the stored category. `NotFound` if it does not exist.
    async fn update_category(&self, category: Category) -> Result<Category>;
    /// `Referenced` if any product still belongs to the category.
    async fn delete_category(&self, id: CategoryId) -> Result<()>;
    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64>;

    async fn insert_discount(&self, discount: Discount) -> Result<Discount>;
    async fn get_discount(&self, id: DiscountId) -> Result<Option<Discount>>;
    async fn list_discounts(&self) -> Result<Vec<Discount>>;

    async fn insert_product(&self, product: Product) -> Result<Product>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;
    async fn list_products(&self, filter: ProductFilter) -> Result<Page<Product>>;
    /// Replaces the stored product. `NotFound` if it does not exist.
    async fn update_product(&self, product: Product) -> Result<Product>;
    /// `Referenced` if any order item references the product. Cart items
    /// referencing it are removed (carts are staging, orders are records).
    async fn delete_product(&self, id: ProductId) -> Result<()>;
}

/// Storage port for the customer aggregate.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Inserts the customer and its address in one transaction.
    async fn insert_customer(&self, customer: Customer, address: Address) -> Result<Customer>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<(Customer, Address)>>;
    async fn list_customers(&self) -> Result<Vec<Customer>>;
}

/// Storage port for the cart aggregate.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn insert_cart(&self, cart: Cart) -> Result<Cart>;
    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>>;
    async fn list_carts(&self) -> Result<Vec<Cart>>;
    async fn delete_cart(&self, id: CartId) -> Result<()>;

    /// Atomic merge-or-insert for a (cart, product) pair.
    ///
    /// If an item for the pair exists its quantity is incremented by
    /// `quantity`, otherwise a new item is created. Two concurrent adds must
    /// sum rather than overwrite; the unique (cart, product) constraint is
    /// the backstop. `NotFound` for a missing cart or product.
    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem>;

    async fn get_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemWithProduct>>;
    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemWithProduct>>;
    /// Overwrites (not merges) the item quantity. `NotFound` if the item is
    /// not in the given cart.
    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem>;
    async fn delete_cart_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<()>;
}

/// Storage port for the order aggregate.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and all items in one transaction. `Duplicate` if two
    /// items share a product.
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()>;
    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>>;
    async fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>>;
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order>;
}

/// Storage port for the comment aggregate.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment>;
    async fn get_comment(&self, product_id: ProductId, id: CommentId) -> Result<Option<Comment>>;
    /// Lists comments for a product, optionally restricted to one status.
    async fn list_comments(
        &self,
        product_id: ProductId,
        status: Option<CommentStatus>,
    ) -> Result<Vec<Comment>>;
    async fn set_comment_status(
        &self,
        product_id: ProductId,
        id: CommentId,
        status: CommentStatus,
    ) -> Result<Comment>;
}

/// A full storage engine: every port plus the bounds the API layer needs to
/// share one handle across handlers.
pub trait Store:
    CatalogStore + CustomerStore + CartStore + OrderStore + CommentStore + Clone + Send + Sync + 'static
{
}

impl<T> Store for T where
    T: CatalogStore
        + CustomerStore
        + CartStore
        + OrderStore
        + CommentStore
        + Clone
        + Send
        + Sync
        + 'static
{
}
