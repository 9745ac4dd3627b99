use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{CartId, CartItemId, CategoryId, CommentId, CustomerId, DiscountId, OrderId, ProductId};

use crate::error::{Result, StoreError};
use crate::query::{Page, ProductFilter, ProductOrder};
use crate::records::{
    Address, Cart, CartItem, CartItemWithProduct, Category, Comment, CommentStatus, Customer,
    Discount, Order, OrderItem, OrderStatus, Product, ProductSnapshot,
};
use crate::store::{CartStore, CatalogStore, CommentStore, CustomerStore, OrderStore};

/// In-memory storage engine.
///
/// All tables live behind a single `RwLock`, so every mutation — including
/// the cart-item merge — is one critical section. Used for tests and for
/// running the server without a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    discounts: HashMap<DiscountId, Discount>,
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    addresses: HashMap<CustomerId, Address>,
    orders: HashMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    carts: HashMap<CartId, Cart>,
    cart_items: Vec<CartItem>,
    comments: Vec<Comment>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn snapshot_for(&self, product_id: ProductId) -> Result<ProductSnapshot> {
        let product = self
            .products
            .get(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        Ok(ProductSnapshot {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_category(&self, category: Category) -> Result<Category> {
        let mut tables = self.tables.write().await;
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<_> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }

    async fn update_category(&self, category: Category) -> Result<Category> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&category.id) {
            return Err(StoreError::not_found("category", category.id));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(StoreError::not_found("category", id));
        }
        if tables.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::Referenced {
                entity: "category",
                id: id.to_string(),
                referenced_by: "product",
            });
        }
        tables.categories.remove(&id);
        Ok(())
    }

    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.category_id == id)
            .count() as u64)
    }

    async fn insert_discount(&self, discount: Discount) -> Result<Discount> {
        let mut tables = self.tables.write().await;
        tables.discounts.insert(discount.id, discount.clone());
        Ok(discount)
    }

    async fn get_discount(&self, id: DiscountId) -> Result<Option<Discount>> {
        let tables = self.tables.read().await;
        Ok(tables.discounts.get(&id).cloned())
    }

    async fn list_discounts(&self) -> Result<Vec<Discount>> {
        let tables = self.tables.read().await;
        let mut discounts: Vec<_> = tables.discounts.values().cloned().collect();
        discounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(discounts)
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&product.category_id) {
            return Err(StoreError::not_found("category", product.category_id));
        }
        for discount_id in &product.discount_ids {
            if !tables.discounts.contains_key(discount_id) {
                return Err(StoreError::not_found("discount", discount_id));
            }
        }
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&id).cloned())
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Page<Product>> {
        let tables = self.tables.read().await;

        let mut matched: Vec<_> = tables
            .products
            .values()
            .filter(|p| {
                if let Some(category_id) = filter.category_id
                    && p.category_id != category_id
                {
                    return false;
                }
                if let Some(min) = filter.min_price
                    && p.price < min
                {
                    return false;
                }
                if let Some(max) = filter.max_price
                    && p.price > max
                {
                    return false;
                }
                if let Some(ref term) = filter.search
                    && !p.name.to_lowercase().contains(&term.to_lowercase())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| match filter.order_by {
            ProductOrder::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            ProductOrder::Price => a.price.cmp(&b.price),
            ProductOrder::Inventory => a.inventory.cmp(&b.inventory),
        });
        if filter.descending {
            matched.reverse();
        }

        let total = matched.len() as u64;
        let items: Vec<_> = matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.effective_page_size() as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: filter.page_number(),
            page_size: filter.effective_page_size(),
        })
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product.id) {
            return Err(StoreError::not_found("product", product.id));
        }
        if !tables.categories.contains_key(&product.category_id) {
            return Err(StoreError::not_found("category", product.category_id));
        }
        for discount_id in &product.discount_ids {
            if !tables.discounts.contains_key(discount_id) {
                return Err(StoreError::not_found("discount", discount_id));
            }
        }
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::not_found("product", id));
        }
        if tables.order_items.iter().any(|i| i.product_id == id) {
            return Err(StoreError::Referenced {
                entity: "product",
                id: id.to_string(),
                referenced_by: "order item",
            });
        }
        // Cart items cascade; featured-product references are cleared.
        tables.cart_items.retain(|i| i.product_id != id);
        tables.comments.retain(|c| c.product_id != id);
        for category in tables.categories.values_mut() {
            if category.top_product == Some(id) {
                category.top_product = None;
            }
        }
        tables.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(&self, customer: Customer, address: Address) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        tables.customers.insert(customer.id, customer.clone());
        tables.addresses.insert(customer.id, address);
        Ok(customer)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<(Customer, Address)>> {
        let tables = self.tables.read().await;
        match (tables.customers.get(&id), tables.addresses.get(&id)) {
            (Some(customer), Some(address)) => Ok(Some((customer.clone(), address.clone()))),
            _ => Ok(None),
        }
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        let mut customers: Vec<_> = tables.customers.values().cloned().collect();
        customers.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(customers)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn insert_cart(&self, cart: Cart) -> Result<Cart> {
        let mut tables = self.tables.write().await;
        tables.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.get(&id).cloned())
    }

    async fn list_carts(&self) -> Result<Vec<Cart>> {
        let tables = self.tables.read().await;
        let mut carts: Vec<_> = tables.carts.values().cloned().collect();
        carts.sort_by_key(|c| c.created_at);
        Ok(carts)
    }

    async fn delete_cart(&self, id: CartId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.carts.remove(&id).is_none() {
            return Err(StoreError::not_found("cart", id));
        }
        tables.cart_items.retain(|i| i.cart_id != id);
        Ok(())
    }

    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        // Single write lock: the read-modify-write below cannot interleave
        // with a concurrent add for the same (cart, product) pair.
        let mut tables = self.tables.write().await;
        if !tables.carts.contains_key(&cart_id) {
            return Err(StoreError::not_found("cart", cart_id));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::not_found("product", product_id));
        }

        if let Some(existing) = tables
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        {
            existing.quantity += quantity;
            return Ok(existing.clone());
        }

        let item = CartItem {
            id: CartItemId::new(),
            cart_id,
            product_id,
            quantity,
        };
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn get_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemWithProduct>> {
        let tables = self.tables.read().await;
        let Some(item) = tables
            .cart_items
            .iter()
            .find(|i| i.id == item_id && i.cart_id == cart_id)
            .cloned()
        else {
            return Ok(None);
        };
        let product = tables.snapshot_for(item.product_id)?;
        Ok(Some(CartItemWithProduct { item, product }))
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemWithProduct>> {
        let tables = self.tables.read().await;
        tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .map(|item| {
                let product = tables.snapshot_for(item.product_id)?;
                Ok(CartItemWithProduct {
                    item: item.clone(),
                    product,
                })
            })
            .collect()
    }

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem> {
        let mut tables = self.tables.write().await;
        let item = tables
            .cart_items
            .iter_mut()
            .find(|i| i.id == item_id && i.cart_id == cart_id)
            .ok_or_else(|| StoreError::not_found("cart item", item_id))?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn delete_cart_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables
            .cart_items
            .retain(|i| !(i.id == item_id && i.cart_id == cart_id));
        if tables.cart_items.len() == before {
            return Err(StoreError::not_found("cart item", item_id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()> {
        let mut tables = self.tables.write().await;
        for (n, item) in items.iter().enumerate() {
            if items[..n].iter().any(|other| other.product_id == item.product_id) {
                return Err(StoreError::Duplicate {
                    entity: "order item",
                    detail: format!("product {} appears twice in order", item.product_id),
                });
            }
        }
        tables.orders.insert(order.id, order);
        tables.order_items.extend(items);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>> {
        let tables = self.tables.read().await;
        let Some(order) = tables.orders.get(&id).cloned() else {
            return Ok(None);
        };
        let items: Vec<_> = tables
            .order_items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        Ok(Some((order, items)))
    }

    async fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| customer_id.is_none_or(|c| o.customer_id == c))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);

        Ok(orders
            .into_iter()
            .map(|order| {
                let items: Vec<_> = tables
                    .order_items
                    .iter()
                    .filter(|i| i.order_id == order.id)
                    .cloned()
                    .collect();
                (order, items)
            })
            .collect())
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&comment.product_id) {
            return Err(StoreError::not_found("product", comment.product_id));
        }
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, product_id: ProductId, id: CommentId) -> Result<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == id && c.product_id == product_id)
            .cloned())
    }

    async fn list_comments(
        &self,
        product_id: ProductId,
        status: Option<CommentStatus>,
    ) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.product_id == product_id)
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect())
    }

    async fn set_comment_status(
        &self,
        product_id: ProductId,
        id: CommentId,
        status: CommentStatus,
    ) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id && c.product_id == product_id)
            .ok_or_else(|| StoreError::not_found("comment", id))?;
        comment.status = status;
        Ok(comment.clone())
    }
}
