//! Cart service: the staging area for a prospective purchase.
//!
//! Carts price live: every read recomputes totals from current product
//! prices. Only a placed order freezes prices.

use chrono::{DateTime, Utc};
use serde::Serialize;

use common::{CartId, CartItemId, Money, ProductId};
use store::{Cart, CartStore, CartItemWithProduct, ProductSnapshot};

use crate::error::{DomainError, Result};

/// One cart line with its product snapshot and live line total.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product: ProductSnapshot,
    pub quantity: u32,
    pub item_total: Money,
}

impl From<CartItemWithProduct> for CartItemView {
    fn from(row: CartItemWithProduct) -> Self {
        let item_total = row.total();
        CartItemView {
            id: row.item.id,
            product: row.product,
            quantity: row.item.quantity,
            item_total,
        }
    }
}

/// A cart with its items and the live grand total.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItemView>,
    pub total_price: Money,
}

/// Service for cart staging.
pub struct CartService<S: CartStore> {
    store: S,
}

impl<S: CartStore> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn validate_quantity(quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(DomainError::validation(
                "quantity",
                "quantity must be a positive integer",
            ));
        }
        Ok(())
    }

    /// Allocates a new cart with a fresh opaque identifier.
    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart> {
        let cart = Cart {
            id: CartId::new(),
            created_at: Utc::now(),
        };
        Ok(self.store.insert_cart(cart).await?)
    }

    pub async fn list_carts(&self) -> Result<Vec<Cart>> {
        Ok(self.store.list_carts().await?)
    }

    /// Adds a product to a cart, merging quantities if the product is already
    /// present.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItemView> {
        Self::validate_quantity(quantity)?;
        let item = self.store.upsert_cart_item(cart_id, product_id, quantity).await?;
        metrics::counter!("cart_items_added_total").increment(1);

        // Re-read joined with the product for the response shape.
        let row = self
            .store
            .get_cart_item(cart_id, item.id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart item", item.id))?;
        Ok(row.into())
    }

    pub async fn get_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<CartItemView> {
        let row = self
            .store
            .get_cart_item(cart_id, item_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart item", item_id))?;
        Ok(row.into())
    }

    pub async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItemView>> {
        // Listing an unknown cart is NotFound, not an empty list.
        self.store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        let rows = self.store.list_cart_items(cart_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Overwrites an item's quantity (no merging).
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItemView> {
        Self::validate_quantity(quantity)?;
        let item = self
            .store
            .set_cart_item_quantity(cart_id, item_id, quantity)
            .await?;
        let row = self
            .store
            .get_cart_item(cart_id, item.id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart item", item.id))?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<()> {
        Ok(self.store.delete_cart_item(cart_id, item_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<()> {
        Ok(self.store.delete_cart(cart_id).await?)
    }

    /// Returns the cart with its items and `total_price = Σ quantity ×
    /// current product price`.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<CartView> {
        let cart = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        let items: Vec<CartItemView> = self
            .store
            .list_cart_items(cart_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let total_price = items.iter().map(|i| i.item_total).sum();

        Ok(CartView {
            id: cart.id,
            created_at: cart.created_at,
            items,
            total_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogService, NewCategory, NewProduct, UpdateProduct};
    use store::MemoryStore;

    async fn setup() -> (CartService<MemoryStore>, CatalogService<MemoryStore>, ProductId) {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let category = catalog
            .create_category(NewCategory {
                title: "Furniture".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let product = catalog
            .create_product(NewProduct {
                name: "Walnut Desk".to_string(),
                description: String::new(),
                price: Money::from_cents(10_000),
                inventory: 5,
                category_id: category.id,
                discount_ids: vec![],
            })
            .await
            .unwrap();
        (CartService::new(store), catalog, product.id)
    }

    #[tokio::test]
    async fn duplicate_add_merges_into_one_item() {
        let (carts, _, product_id) = setup().await;
        let cart = carts.create_cart().await.unwrap();

        carts.add_item(cart.id, product_id, 2).await.unwrap();
        let item = carts.add_item(cart.id, product_id, 3).await.unwrap();
        assert_eq!(item.quantity, 5);

        let view = carts.get_cart(cart.id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.total_price.cents(), 50_000);
    }

    #[tokio::test]
    async fn zero_quantity_rejected() {
        let (carts, _, product_id) = setup().await;
        let cart = carts.create_cart().await.unwrap();

        let result = carts.add_item(cart.id, product_id, 0).await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "quantity", .. })
        ));
    }

    #[tokio::test]
    async fn add_to_unknown_cart_not_found() {
        let (carts, _, product_id) = setup().await;
        let result = carts.add_item(CartId::new(), product_id, 1).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "cart", .. })));
    }

    #[tokio::test]
    async fn add_unknown_product_not_found() {
        let (carts, _, _) = setup().await;
        let cart = carts.create_cart().await.unwrap();
        let result = carts.add_item(cart.id, ProductId::new(), 1).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "product", .. })
        ));
    }

    #[tokio::test]
    async fn update_overwrites_quantity() {
        let (carts, _, product_id) = setup().await;
        let cart = carts.create_cart().await.unwrap();
        let item = carts.add_item(cart.id, product_id, 2).await.unwrap();

        let updated = carts
            .update_item_quantity(cart.id, item.id, 7)
            .await
            .unwrap();
        assert_eq!(updated.quantity, 7);
    }

    #[tokio::test]
    async fn total_tracks_current_product_price() {
        let (carts, catalog, product_id) = setup().await;
        let cart = carts.create_cart().await.unwrap();
        carts.add_item(cart.id, product_id, 2).await.unwrap();

        assert_eq!(carts.get_cart(cart.id).await.unwrap().total_price.cents(), 20_000);

        // Reprice the product: the cart total follows.
        catalog
            .update_product(
                product_id,
                UpdateProduct {
                    price: Some(Money::from_cents(15_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(carts.get_cart(cart.id).await.unwrap().total_price.cents(), 30_000);
    }

    #[tokio::test]
    async fn remove_and_delete() {
        let (carts, _, product_id) = setup().await;
        let cart = carts.create_cart().await.unwrap();
        let item = carts.add_item(cart.id, product_id, 1).await.unwrap();

        carts.remove_item(cart.id, item.id).await.unwrap();
        assert!(carts.get_cart(cart.id).await.unwrap().items.is_empty());

        carts.delete_cart(cart.id).await.unwrap();
        assert!(matches!(
            carts.get_cart(cart.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
