//! Catalog service: categories, discounts, products.

use chrono::Utc;

use common::{CategoryId, DiscountId, Money, ProductId};
use store::{Category, CatalogStore, Discount, Page, Product, ProductFilter};

use crate::error::{DomainError, Result};
use crate::slug::slugify;

/// Minimum length of a category title, in characters.
const MIN_TITLE_LEN: usize = 3;

/// Minimum length of a product name, in characters.
const MIN_NAME_LEN: usize = 6;

/// Input for creating a category. `top_product` is only settable via update,
/// since a brand-new category has no products yet.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
}

/// Partial update for a category; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub title: Option<String>,
    pub description: Option<String>,
    pub top_product: Option<ProductId>,
}

/// Input for creating a discount.
#[derive(Debug, Clone)]
pub struct NewDiscount {
    pub percentage: f64,
    pub description: String,
}

/// Input for creating a product. The slug is derived from the name.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub inventory: i32,
    pub category_id: CategoryId,
    pub discount_ids: Vec<DiscountId>,
}

/// Partial update for a product; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub inventory: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub discount_ids: Option<Vec<DiscountId>>,
}

/// Service for catalog management.
pub struct CatalogService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn validate_title(title: &str) -> Result<()> {
        if title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(DomainError::validation(
                "title",
                format!("category title must be at least {MIN_TITLE_LEN} characters"),
            ));
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().chars().count() < MIN_NAME_LEN {
            return Err(DomainError::validation(
                "name",
                format!("product name must be at least {MIN_NAME_LEN} characters"),
            ));
        }
        Ok(())
    }

    fn validate_price(price: Money) -> Result<()> {
        if price.is_negative() {
            return Err(DomainError::validation("price_cents", "price must not be negative"));
        }
        Ok(())
    }

    fn validate_inventory(inventory: i32) -> Result<()> {
        if inventory < 0 {
            return Err(DomainError::validation(
                "inventory",
                "inventory must not be negative",
            ));
        }
        Ok(())
    }

    // -- Categories --

    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        Self::validate_title(&input.title)?;
        let category = Category {
            id: CategoryId::new(),
            title: input.title,
            description: input.description,
            top_product: None,
        };
        Ok(self.store.insert_category(category).await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Number of products currently in a category, for listing responses.
    pub async fn category_product_count(&self, id: CategoryId) -> Result<u64> {
        Ok(self.store.count_products_in_category(id).await?)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_category(&self, id: CategoryId, update: UpdateCategory) -> Result<Category> {
        let mut category = self.get_category(id).await?;
        if let Some(title) = update.title {
            Self::validate_title(&title)?;
            category.title = title;
        }
        if let Some(description) = update.description {
            category.description = description;
        }
        if let Some(top_product) = update.top_product {
            // The featured product must come from this category's own set.
            let product = self.get_product(top_product).await.map_err(|_| {
                DomainError::validation("top_product", "product does not exist")
            })?;
            if product.category_id != id {
                return Err(DomainError::validation(
                    "top_product",
                    "product does not belong to this category",
                ));
            }
            category.top_product = Some(top_product);
        }
        Ok(self.store.update_category(category).await?)
    }

    /// Deletes a category. Conflict if any product still belongs to it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        Ok(self.store.delete_category(id).await?)
    }

    // -- Discounts --

    /// Creates a discount. The percentage range is conventionally [0, 50] but
    /// deliberately not enforced.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_discount(&self, input: NewDiscount) -> Result<Discount> {
        let discount = Discount {
            id: DiscountId::new(),
            percentage: input.percentage,
            description: input.description,
        };
        Ok(self.store.insert_discount(discount).await?)
    }

    pub async fn list_discounts(&self) -> Result<Vec<Discount>> {
        Ok(self.store.list_discounts().await?)
    }

    // -- Products --

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        Self::validate_name(&input.name)?;
        Self::validate_price(input.price)?;
        Self::validate_inventory(input.inventory)?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            slug: slugify(&input.name),
            name: input.name,
            description: input.description,
            price: input.price,
            inventory: input.inventory,
            category_id: input.category_id,
            discount_ids: input.discount_ids,
            created_at: now,
            updated_at: now,
        };
        let product = self.store.insert_product(product).await?;
        metrics::counter!("catalog_products_created_total").increment(1);
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))
    }

    pub async fn list_products(&self, filter: ProductFilter) -> Result<Page<Product>> {
        Ok(self.store.list_products(filter).await?)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: UpdateProduct) -> Result<Product> {
        let mut product = self.get_product(id).await?;
        if let Some(name) = update.name {
            Self::validate_name(&name)?;
            product.slug = slugify(&name);
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            Self::validate_price(price)?;
            product.price = price;
        }
        if let Some(inventory) = update.inventory {
            Self::validate_inventory(inventory)?;
            product.inventory = inventory;
        }
        if let Some(category_id) = update.category_id {
            product.category_id = category_id;
        }
        if let Some(discount_ids) = update.discount_ids {
            product.discount_ids = discount_ids;
        }
        product.updated_at = Utc::now();
        Ok(self.store.update_product(product).await?)
    }

    /// Deletes a product. Conflict while any order item references it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        Ok(self.store.delete_product(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn service() -> CatalogService<MemoryStore> {
        CatalogService::new(MemoryStore::new())
    }

    async fn seed_category(service: &CatalogService<MemoryStore>) -> Category {
        service
            .create_category(NewCategory {
                title: "Furniture".to_string(),
                description: "Desks and chairs".to_string(),
            })
            .await
            .unwrap()
    }

    async fn seed_product(
        service: &CatalogService<MemoryStore>,
        category_id: CategoryId,
        name: &str,
    ) -> Product {
        service
            .create_product(NewProduct {
                name: name.to_string(),
                description: String::new(),
                price: Money::from_cents(10_000),
                inventory: 5,
                category_id,
                discount_ids: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn short_category_title_rejected() {
        let service = service();
        let result = service
            .create_category(NewCategory {
                title: "ab".to_string(),
                description: String::new(),
            })
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "title", .. })
        ));
    }

    #[tokio::test]
    async fn short_title_rejected_on_update_too() {
        let service = service();
        let category = seed_category(&service).await;
        let result = service
            .update_category(
                category.id,
                UpdateCategory {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn short_product_name_rejected() {
        let service = service();
        let category = seed_category(&service).await;
        let result = service
            .create_product(NewProduct {
                name: "Desk".to_string(),
                description: String::new(),
                price: Money::from_cents(100),
                inventory: 1,
                category_id: category.id,
                discount_ids: vec![],
            })
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "name", .. })
        ));
    }

    #[tokio::test]
    async fn negative_price_and_inventory_rejected() {
        let service = service();
        let category = seed_category(&service).await;

        let result = service
            .create_product(NewProduct {
                name: "Walnut Desk".to_string(),
                description: String::new(),
                price: Money::from_cents(-1),
                inventory: 1,
                category_id: category.id,
                discount_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let result = service
            .create_product(NewProduct {
                name: "Walnut Desk".to_string(),
                description: String::new(),
                price: Money::from_cents(1),
                inventory: -1,
                category_id: category.id,
                discount_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn slug_is_derived_and_follows_renames() {
        let service = service();
        let category = seed_category(&service).await;
        let product = seed_product(&service, category.id, "Walnut Desk").await;
        assert_eq!(product.slug, "walnut-desk");

        let updated = service
            .update_product(
                product.id,
                UpdateProduct {
                    name: Some("Standing Desk".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "standing-desk");
    }

    #[tokio::test]
    async fn top_product_must_belong_to_category() {
        let service = service();
        let category = seed_category(&service).await;
        let other = service
            .create_category(NewCategory {
                title: "Lighting".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let foreign = seed_product(&service, other.id, "Table Lamp XL").await;

        let result = service
            .update_category(
                category.id,
                UpdateCategory {
                    top_product: Some(foreign.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "top_product", .. })
        ));

        // A product of its own is accepted.
        let own = seed_product(&service, category.id, "Walnut Desk").await;
        let updated = service
            .update_category(
                category.id,
                UpdateCategory {
                    top_product: Some(own.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.top_product, Some(own.id));
    }

    #[tokio::test]
    async fn delete_category_with_products_conflicts() {
        let service = service();
        let category = seed_category(&service).await;
        seed_product(&service, category.id, "Walnut Desk").await;

        let result = service.delete_category(category.id).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn product_with_unknown_category_not_found() {
        let service = service();
        let result = service
            .create_product(NewProduct {
                name: "Walnut Desk".to_string(),
                description: String::new(),
                price: Money::from_cents(100),
                inventory: 1,
                category_id: CategoryId::new(),
                discount_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
