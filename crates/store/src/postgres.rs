use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{
    CartId, CartItemId, CategoryId, CommentId, CustomerId, DiscountId, Money, OrderId, OrderItemId,
    ProductId,
};

use crate::error::{Result, StoreError};
use crate::query::{Page, ProductFilter, ProductOrder};
use crate::records::{
    Address, Cart, CartItem, CartItemWithProduct, Category, Comment, CommentStatus, Customer,
    Discount, Order, OrderItem, OrderStatus, Product, ProductSnapshot,
};
use crate::store::{CartStore, CatalogStore, CommentStore, CustomerStore, OrderStore};

/// PostgreSQL-backed storage engine.
///
/// Uniqueness and referential invariants are enforced by the schema; this
/// implementation maps constraint violations back to typed [`StoreError`]s.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and wraps the pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_category(row: &PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            top_product: row
                .try_get::<Option<Uuid>, _>("top_product")?
                .map(ProductId::from_uuid),
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            inventory: row.try_get("inventory")?,
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            discount_ids: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_customer(row: &PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            birth_date: row.try_get("birth_date")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
        Ok(CartItem {
            id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        })
    }

    fn row_to_cart_item_with_product(row: &PgRow) -> Result<CartItemWithProduct> {
        Ok(CartItemWithProduct {
            item: Self::row_to_cart_item(row)?,
            product: ProductSnapshot {
                id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                name: row.try_get("product_name")?,
                price: Money::from_cents(row.try_get("product_price_cents")?),
            },
        })
    }

    fn row_to_comment(row: &PgRow) -> Result<Comment> {
        let status: String = row.try_get("status")?;
        Ok(Comment {
            id: CommentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            name: row.try_get("name")?,
            body: row.try_get("body")?,
            status: status
                .parse::<CommentStatus>()
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }

    /// Loads the discount ids for a batch of products in one query.
    async fn attach_discounts(&self, products: &mut [Product]) -> Result<()> {
        if products.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT product_id, discount_id FROM product_discounts WHERE product_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<Uuid, Vec<DiscountId>> = HashMap::new();
        for row in rows {
            by_product
                .entry(row.try_get("product_id")?)
                .or_default()
                .push(DiscountId::from_uuid(row.try_get::<Uuid, _>("discount_id")?));
        }
        for product in products.iter_mut() {
            if let Some(discounts) = by_product.remove(&product.id.as_uuid()) {
                product.discount_ids = discounts;
            }
        }
        Ok(())
    }
}

/// Maps a constraint violation to a typed error, falling back to `Database`.
fn constraint_error(
    e: sqlx::Error,
    mappings: &[(&str, fn(String) -> StoreError)],
    detail: String,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(constraint) = db_err.constraint()
    {
        for (name, make) in mappings {
            if constraint == *name {
                return make(detail);
            }
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_category(&self, category: Category) -> Result<Category> {
        sqlx::query(
            "INSERT INTO categories (id, title, description, top_product) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.title)
        .bind(&category.description)
        .bind(category.top_product.map(|p| p.as_uuid()))
        .execute(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, title, description, top_product FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_category(&r)).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows =
            sqlx::query("SELECT id, title, description, top_product FROM categories ORDER BY title")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_category).collect()
    }

    async fn update_category(&self, category: Category) -> Result<Category> {
        let result = sqlx::query(
            "UPDATE categories SET title = $2, description = $3, top_product = $4 WHERE id = $1",
        )
        .bind(category.id.as_uuid())
        .bind(&category.title)
        .bind(&category.description)
        .bind(category.top_product.map(|p| p.as_uuid()))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", category.id));
        }
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE category_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        if referenced {
            return Err(StoreError::Referenced {
                entity: "category",
                id: id.to_string(),
                referenced_by: "product",
            });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    &[("fk_products_category", |id| StoreError::Referenced {
                        entity: "category",
                        id,
                        referenced_by: "product",
                    })],
                    id.to_string(),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn insert_discount(&self, discount: Discount) -> Result<Discount> {
        sqlx::query("INSERT INTO discounts (id, percentage, description) VALUES ($1, $2, $3)")
            .bind(discount.id.as_uuid())
            .bind(discount.percentage)
            .bind(&discount.description)
            .execute(&self.pool)
            .await?;
        Ok(discount)
    }

    async fn get_discount(&self, id: DiscountId) -> Result<Option<Discount>> {
        let row = sqlx::query("SELECT id, percentage, description FROM discounts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| -> Result<Discount> {
                Ok(Discount {
                    id: DiscountId::from_uuid(r.try_get::<Uuid, _>("id")?),
                    percentage: r.try_get("percentage")?,
                    description: r.try_get("description")?,
                })
            })
            .transpose()?)
    }

    async fn list_discounts(&self) -> Result<Vec<Discount>> {
        let rows = sqlx::query("SELECT id, percentage, description FROM discounts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(Discount {
                    id: DiscountId::from_uuid(r.try_get::<Uuid, _>("id")?),
                    percentage: r.try_get("percentage")?,
                    description: r.try_get("description")?,
                })
            })
            .collect()
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, description, price_cents, inventory, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.inventory)
        .bind(product.category_id.as_uuid())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                &[("fk_products_category", |id| {
                    StoreError::NotFound { entity: "category", id }
                })],
                product.category_id.to_string(),
            )
        })?;

        for discount_id in &product.discount_ids {
            sqlx::query("INSERT INTO product_discounts (product_id, discount_id) VALUES ($1, $2)")
                .bind(product.id.as_uuid())
                .bind(discount_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    constraint_error(
                        e,
                        &[("fk_product_discounts_discount", |id| StoreError::NotFound {
                            entity: "discount",
                            id,
                        })],
                        discount_id.to_string(),
                    )
                })?;
        }

        tx.commit().await?;
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, description, price_cents, inventory, category_id, created_at, updated_at
            FROM products WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let mut products = vec![Self::row_to_product(&row)?];
        self.attach_discounts(&mut products).await?;
        Ok(products.pop())
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Page<Product>> {
        let mut conditions = String::new();
        let mut param_count = 0;

        // Build dynamic WHERE clause; ORDER BY comes from an enum, never from
        // client input.
        if filter.category_id.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if filter.min_price.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND price_cents >= ${param_count}"));
        }
        if filter.max_price.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND price_cents <= ${param_count}"));
        }
        if filter.search.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND name ILIKE ${param_count}"));
        }

        let order_column = match filter.order_by {
            ProductOrder::Name => "name",
            ProductOrder::Price => "price_cents",
            ProductOrder::Inventory => "inventory",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };

        let select_sql = format!(
            "SELECT id, name, slug, description, price_cents, inventory, category_id, created_at, updated_at \
             FROM products WHERE 1=1{conditions} ORDER BY {order_column} {direction}, id ASC \
             LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2,
        );
        let count_sql = format!("SELECT COUNT(*) FROM products WHERE 1=1{conditions}");

        fn constrain<F>(f: F) -> F
        where
            F: for<'a> Fn(
                sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments>,
            )
                -> sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments>,
        {
            f
        }
        let bind_filters = constrain(|mut q| {
            if let Some(id) = filter.category_id {
                q = q.bind(id.as_uuid());
            }
            if let Some(min) = filter.min_price {
                q = q.bind(min.cents());
            }
            if let Some(max) = filter.max_price {
                q = q.bind(max.cents());
            }
            if let Some(ref term) = filter.search {
                q = q.bind(format!("%{term}%"));
            }
            q
        });

        let rows = bind_filters(sqlx::query(&select_sql))
            .bind(filter.effective_page_size() as i64)
            .bind(filter.offset() as i64)
            .fetch_all(&self.pool)
            .await?;
        let mut items: Vec<Product> = rows
            .iter()
            .map(Self::row_to_product)
            .collect::<Result<_>>()?;
        self.attach_discounts(&mut items).await?;

        let total: i64 = bind_filters(sqlx::query(&count_sql))
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        Ok(Page {
            items,
            total: total as u64,
            page: filter.page_number(),
            page_size: filter.effective_page_size(),
        })
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, slug = $3, description = $4, price_cents = $5,
                inventory = $6, category_id = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.inventory)
        .bind(product.category_id.as_uuid())
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                &[("fk_products_category", |id| {
                    StoreError::NotFound { entity: "category", id }
                })],
                product.category_id.to_string(),
            )
        })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product.id));
        }

        sqlx::query("DELETE FROM product_discounts WHERE product_id = $1")
            .bind(product.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        for discount_id in &product.discount_ids {
            sqlx::query("INSERT INTO product_discounts (product_id, discount_id) VALUES ($1, $2)")
                .bind(product.id.as_uuid())
                .bind(discount_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    constraint_error(
                        e,
                        &[("fk_product_discounts_discount", |id| StoreError::NotFound {
                            entity: "discount",
                            id,
                        })],
                        discount_id.to_string(),
                    )
                })?;
        }

        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        if referenced {
            return Err(StoreError::Referenced {
                entity: "product",
                id: id.to_string(),
                referenced_by: "order item",
            });
        }

        // Cart items and comments cascade; order items are the RESTRICT
        // backstop should a concurrent order land between the check and here.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    &[("fk_order_items_product", |id| StoreError::Referenced {
                        entity: "product",
                        id,
                        referenced_by: "order item",
                    })],
                    id.to_string(),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn insert_customer(&self, customer: Customer, address: Address) -> Result<Customer> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, first_name, last_name, email, phone_number, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone_number)
        .bind(customer.birth_date)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO addresses (customer_id, province, city, street) VALUES ($1, $2, $3, $4)",
        )
        .bind(address.customer_id.as_uuid())
        .bind(&address.province)
        .bind(&address.city)
        .bind(&address.street)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(customer)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<(Customer, Address)>> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.first_name, c.last_name, c.email, c.phone_number, c.birth_date,
                   a.province, a.city, a.street
            FROM customers c
            JOIN addresses a ON a.customer_id = c.id
            WHERE c.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let customer = Self::row_to_customer(&r)?;
            let address = Address {
                customer_id: customer.id,
                province: r.try_get("province")?,
                city: r.try_get("city")?,
                street: r.try_get("street")?,
            };
            Ok((customer, address))
        })
        .transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone_number, birth_date
            FROM customers ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_customer).collect()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn insert_cart(&self, cart: Cart) -> Result<Cart> {
        sqlx::query("INSERT INTO carts (id, created_at) VALUES ($1, $2)")
            .bind(cart.id.as_uuid())
            .bind(cart.created_at)
            .execute(&self.pool)
            .await?;
        Ok(cart)
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, created_at FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok(Cart {
                id: CartId::from_uuid(r.try_get::<Uuid, _>("id")?),
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn list_carts(&self) -> Result<Vec<Cart>> {
        let rows = sqlx::query("SELECT id, created_at FROM carts ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(Cart {
                    id: CartId::from_uuid(r.try_get::<Uuid, _>("id")?),
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn delete_cart(&self, id: CartId) -> Result<()> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart", id));
        }
        Ok(())
    }

    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        // Single atomic statement: the unique (cart_id, product_id)
        // constraint makes concurrent adds for the same pair serialize, so
        // quantities sum instead of overwriting.
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, product_id, quantity
            "#,
        )
        .bind(CartItemId::new().as_uuid())
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("fk_cart_items_cart") => {
                        return StoreError::not_found("cart", cart_id);
                    }
                    Some("fk_cart_items_product") => {
                        return StoreError::not_found("product", product_id);
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Self::row_to_cart_item(&row)
    }

    async fn get_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemWithProduct>> {
        let row = sqlx::query(
            r#"
            SELECT i.id, i.cart_id, i.product_id, i.quantity,
                   p.name AS product_name, p.price_cents AS product_price_cents
            FROM cart_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.id = $1 AND i.cart_id = $2
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(cart_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::row_to_cart_item_with_product(&r)).transpose()
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemWithProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.cart_id, i.product_id, i.quantity,
                   p.name AS product_name, p.price_cents AS product_price_cents
            FROM cart_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.cart_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_cart_item_with_product).collect()
    }

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem> {
        let row = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3
            WHERE id = $1 AND cart_id = $2
            RETURNING id, cart_id, product_id, quantity
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(cart_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_cart_item(&row),
            None => Err(StoreError::not_found("cart item", item_id)),
        }
    }

    async fn delete_cart_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id.as_uuid())
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart item", item_id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                &[("fk_orders_customer", |id| {
                    StoreError::NotFound { entity: "customer", id }
                })],
                order.customer_id.to_string(),
            )
        })?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    &[
                        ("unique_order_product", |detail| StoreError::Duplicate {
                            entity: "order item",
                            detail,
                        }),
                        ("fk_order_items_product", |id| {
                            StoreError::NotFound { entity: "product", id }
                        }),
                    ],
                    format!("product {} appears twice in order", item.product_id),
                )
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, created_at, updated_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let order = Self::row_to_order(&row)?;

        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items WHERE order_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        let items: Vec<OrderItem> = item_rows
            .iter()
            .map(Self::row_to_order_item)
            .collect::<Result<_>>()?;

        Ok(Some((order, items)))
    }

    async fn list_orders(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>> {
        let rows = match customer_id {
            Some(customer_id) => {
                sqlx::query(
                    r#"
                    SELECT id, customer_id, status, created_at, updated_at
                    FROM orders WHERE customer_id = $1 ORDER BY created_at
                    "#,
                )
                .bind(customer_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, customer_id, status, created_at, updated_at FROM orders ORDER BY created_at",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        let orders: Vec<Order> = rows.iter().map(Self::row_to_order).collect::<Result<_>>()?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items WHERE order_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let item = Self::row_to_order_item(row)?;
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                (order, items)
            })
            .collect())
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, customer_id, status, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(&row),
            None => Err(StoreError::not_found("order", id)),
        }
    }
}

#[async_trait]
impl CommentStore for PostgresStore {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment> {
        sqlx::query(
            "INSERT INTO comments (id, product_id, name, body, status) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id.as_uuid())
        .bind(comment.product_id.as_uuid())
        .bind(&comment.name)
        .bind(&comment.body)
        .bind(comment.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                &[("comments_product_id_fkey", |id| {
                    StoreError::NotFound { entity: "product", id }
                })],
                comment.product_id.to_string(),
            )
        })?;
        Ok(comment)
    }

    async fn get_comment(&self, product_id: ProductId, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, product_id, name, body, status FROM comments WHERE id = $1 AND product_id = $2",
        )
        .bind(id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::row_to_comment(&r)).transpose()
    }

    async fn list_comments(
        &self,
        product_id: ProductId,
        status: Option<CommentStatus>,
    ) -> Result<Vec<Comment>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT id, product_id, name, body, status
                    FROM comments WHERE product_id = $1 AND status = $2
                    "#,
                )
                .bind(product_id.as_uuid())
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, product_id, name, body, status FROM comments WHERE product_id = $1",
                )
                .bind(product_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(Self::row_to_comment).collect()
    }

    async fn set_comment_status(
        &self,
        product_id: ProductId,
        id: CommentId,
        status: CommentStatus,
    ) -> Result<Comment> {
        let row = sqlx::query(
            r#"
            UPDATE comments SET status = $3
            WHERE id = $1 AND product_id = $2
            RETURNING id, product_id, name, body, status
            "#,
        )
        .bind(id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_comment(&row),
            None => Err(StoreError::not_found("comment", id)),
        }
    }
}
